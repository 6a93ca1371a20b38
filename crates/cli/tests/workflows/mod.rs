//! Workflow integration tests
//!
//! Each test drives the binary over a scratch library. Only copy-only
//! formats are used so no encoder needs to be installed.

pub mod mirror;
pub mod settings;
