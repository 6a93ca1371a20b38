//! Decision engine
//!
//! Diffs the normalized source inventory against the destination inventory
//! and produces every create/refresh/delete decision for one run. Planning
//! is pure; `Reconciler::apply` performs the structural mutations
//! (deletions and directory creation) that must finish before any file job
//! starts.

use crate::error::{IoContext, Result, SyncError};
use crate::format::TargetFormat;
use crate::path;
use crate::scan::{DestInventory, SourceFile, SourceInventory};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// One file job: physical source name to logical destination name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source: String,
    pub dest: String,
}

/// Decisions for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Stale destination files, deleted and then recreated
    pub refresh: Vec<String>,
    /// Destination files with no logical source counterpart
    pub delete_files: Vec<String>,
    /// Topmost destination directories with no source counterpart
    pub delete_dirs: Vec<String>,
    /// Required directories missing from the destination
    pub create_dirs: Vec<String>,
    /// Non-lossless files to copy
    pub copies: Vec<Job>,
    /// Lossless files to encode
    pub transcodes: Vec<Job>,
    /// Lossless files whose encoded copy is current; only tags may differ
    pub retags: Vec<Job>,
}

impl Plan {
    /// Whether the plan creates, refreshes or deletes anything
    pub fn has_changes(&self) -> bool {
        !(self.refresh.is_empty()
            && self.delete_files.is_empty()
            && self.delete_dirs.is_empty()
            && self.create_dirs.is_empty()
            && self.copies.is_empty()
            && self.transcodes.is_empty())
    }

    /// Log every decision without acting on it
    pub fn log(&self) {
        for name in &self.refresh {
            info!("Would refresh {}", name);
        }
        for name in self.delete_files.iter().chain(&self.delete_dirs) {
            info!("Would delete {}", name);
        }
        for name in &self.create_dirs {
            info!("Would create {}", name);
        }
        for job in &self.copies {
            info!("Would create {}", job.dest);
        }
        for job in &self.transcodes {
            info!("Would convert {} to {}", job.source, job.dest);
        }
        for job in &self.retags {
            debug!("Would check tags of {}", job.dest);
        }
    }
}

/// Computes and applies the structural part of a plan
pub struct Reconciler {
    format: TargetFormat,
}

impl Reconciler {
    pub fn new(format: TargetFormat) -> Self {
        Self { format }
    }

    /// Destination name of a source file
    pub fn target_name(&self, logical: &str, file: &SourceFile) -> String {
        if file.lossless {
            path::with_extension(logical, self.format.extension())
        } else {
            logical.to_string()
        }
    }

    /// Compute all decisions for one run
    pub fn plan(&self, source: &SourceInventory, dest: &DestInventory) -> Result<Plan> {
        let image = self.source_image(source)?;
        let mut plan = Plan::default();

        for (name, file) in &image {
            path::ensure_safe(name)?;
            path::ensure_safe(&file.physical)?;

            let job = Job {
                source: file.physical.clone(),
                dest: name.clone(),
            };

            match dest.files.get(name) {
                // Equal times count as stale
                Some(dest_mtime) if file.mtime >= *dest_mtime => {
                    plan.refresh.push(name.clone());
                }
                Some(_) => {
                    if file.lossless {
                        plan.retags.push(job);
                    }
                    continue;
                }
                None => {}
            }

            if file.lossless {
                plan.transcodes.push(job);
            } else {
                plan.copies.push(job);
            }
        }

        plan.delete_files = dest
            .files
            .keys()
            .filter(|name| !image.contains_key(name.as_str()))
            .cloned()
            .collect();

        let orphan_dirs: BTreeSet<&str> = dest
            .dirs
            .difference(&source.dirs)
            .map(String::as_str)
            .collect();
        plan.delete_dirs = orphan_dirs
            .iter()
            .filter(|name| !path::ancestors(name).any(|a| orphan_dirs.contains(&a)))
            .map(|name| name.to_string())
            .collect();

        plan.create_dirs = source.dirs.difference(&dest.dirs).cloned().collect();

        Ok(plan)
    }

    /// Destination image of the source: target name to source file
    fn source_image<'a>(&self, source: &'a SourceInventory) -> Result<BTreeMap<String, &'a SourceFile>> {
        let mut image: BTreeMap<String, &SourceFile> = BTreeMap::new();
        for (logical, file) in &source.files {
            let name = self.target_name(logical, file);
            if let Some(existing) = image.get(&name) {
                return Err(SyncError::NameCollision {
                    logical: name,
                    first: existing.physical.clone(),
                    second: file.physical.clone(),
                });
            }
            image.insert(name, file);
        }
        Ok(image)
    }

    /// Delete stale and orphaned entries, then create missing directories
    pub fn apply(&self, plan: &Plan, dest_root: &Path) -> Result<()> {
        for name in &plan.refresh {
            path::ensure_safe(name)?;
            debug!("Refresh {}", name);
            let target = dest_root.join(name);
            fs::remove_file(&target).at(&target)?;
        }

        for name in &plan.delete_files {
            path::ensure_safe(name)?;
            info!("Delete {}", name);
            let target = dest_root.join(name);
            fs::remove_file(&target).at(&target)?;
        }

        for name in &plan.delete_dirs {
            path::ensure_safe(name)?;
            info!("Delete {}", name);
            // Best effort: parts of the subtree may already be gone
            let _ = fs::remove_dir_all(dest_root.join(name));
        }

        for name in &plan.create_dirs {
            path::ensure_safe(name)?;
            debug!("Create {}", name);
            let target = dest_root.join(name);
            fs::create_dir_all(&target).at(&target)?;
        }

        Ok(())
    }
}
