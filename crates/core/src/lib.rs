//! Incremental media tree mirroring
//!
//! This crate provides:
//! - Permission-aware source filtering (`access`)
//! - Logical/physical name mapping under a naming policy (`normalize`)
//! - Source and destination inventories (`scan`)
//! - The create/refresh/delete decision engine (`reconcile`)
//! - A bounded worker pool that applies copy, transcode and retag jobs
//!   with write-then-rename semantics (`executor`)

pub mod access;
pub mod config;
pub mod error;
pub mod executor;
pub mod format;
pub mod fsops;
pub mod normalize;
pub mod path;
pub mod reconcile;
pub mod scan;
pub mod sync;
pub mod tags;

// Re-exports
pub use access::{AccessFilter, UserIdentity};
pub use config::{ConfigFile, SyncConfig};
pub use error::{Result, SyncError};
pub use executor::{ExecutionReport, Executor, JobOutcome, WorkerPool};
pub use format::TargetFormat;
pub use normalize::{NamePolicy, Normalizer};
pub use reconcile::{Job, Plan, Reconciler};
pub use scan::{DestInventory, SourceFile, SourceInventory};
pub use sync::{run, SyncReport};
pub use tags::{MediaBackend, TagReader, TagSet};
