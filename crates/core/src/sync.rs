//! One complete mirroring run

use crate::access::{AccessFilter, UserIdentity};
use crate::config::SyncConfig;
use crate::error::{IoContext, Result, SyncError};
use crate::executor::Executor;
use crate::normalize::Normalizer;
use crate::reconcile::{Plan, Reconciler};
use crate::scan::{scan_destination, scan_source};
use crate::tags::MediaBackend;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// What a run did (or, in dry-run mode, would do)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created_dirs: usize,
    pub deleted_dirs: usize,
    pub deleted_files: usize,
    pub refreshed: usize,
    pub copied: usize,
    pub converted: usize,
    pub retagged: usize,
}

impl SyncReport {
    fn from_plan(plan: &Plan) -> Self {
        Self {
            created_dirs: plan.create_dirs.len(),
            deleted_dirs: plan.delete_dirs.len(),
            deleted_files: plan.delete_files.len(),
            refreshed: plan.refresh.len(),
            copied: plan.copies.len(),
            converted: plan.transcodes.len(),
            retagged: 0,
        }
    }

    /// Whether anything was created, refreshed or deleted
    pub fn has_changes(&self) -> bool {
        self.created_dirs
            + self.deleted_dirs
            + self.deleted_files
            + self.refreshed
            + self.copied
            + self.converted
            > 0
    }
}

/// Mirror `config.source` into `config.destination`
///
/// Scanning and planning finish before the destination is touched; any
/// error there leaves the destination unchanged.
pub fn run<B: MediaBackend>(config: &SyncConfig, backend: &B) -> Result<SyncReport> {
    config.validate()?;
    debug!("start");

    let source_root = fs::canonicalize(&config.source).at(&config.source)?;
    if !source_root.is_dir() {
        return Err(SyncError::Config(format!(
            "source {} is not a directory",
            source_root.display()
        )));
    }

    let dest_root = resolve_destination(config)?;
    if dest_root.starts_with(&source_root) || source_root.starts_with(&dest_root) {
        return Err(SyncError::Config(format!(
            "source {} and destination {} overlap",
            source_root.display(),
            dest_root.display()
        )));
    }

    let identity = config
        .user
        .as_deref()
        .map(UserIdentity::lookup)
        .transpose()?;
    let mut access = AccessFilter::new(identity, &source_root);
    let normalizer = Normalizer::new(config.policy, backend);

    let source = scan_source(&source_root, &config.file_filter(), &mut access, &normalizer)?;
    let dest = scan_destination(&dest_root)?;

    let reconciler = Reconciler::new(config.format);
    let plan = reconciler.plan(&source, &dest)?;
    let mut report = SyncReport::from_plan(&plan);

    if config.dry_run {
        plan.log();
        info!("Dry run: destination left unchanged");
        debug!("stop");
        return Ok(report);
    }

    reconciler.apply(&plan, &dest_root)?;

    let executor = Executor::new(
        &source_root,
        &dest_root,
        config.format,
        backend,
        config.worker_pool(),
    )
    .coarse_time(config.coarse_time);

    let executed = executor.run(&plan)?;
    report.retagged = executed.retagged;
    executor.flatten_dirs(&source.dirs)?;

    debug!("stop");
    Ok(report)
}

/// Canonical destination root, created unless this is a dry run
fn resolve_destination(config: &SyncConfig) -> Result<PathBuf> {
    if !config.dry_run {
        fs::create_dir_all(&config.destination).at(&config.destination)?;
    }

    match fs::canonicalize(&config.destination) {
        Ok(path) => Ok(path),
        Err(err) if config.dry_run && err.kind() == std::io::ErrorKind::NotFound => {
            Ok(config.destination.clone())
        }
        Err(err) => Err(SyncError::io(&config.destination, err)),
    }
}
