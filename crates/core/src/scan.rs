//! Source and destination inventories
//!
//! Both trees are walked once per run before anything is mutated. The
//! source walk follows symlinks and applies the access and file filters;
//! the destination walk records everything it finds.

use crate::access::AccessFilter;
use crate::error::{Result, SyncError};
use crate::format::{is_lossless, FileFilter};
use crate::normalize::Normalizer;
use crate::path;
use filetime::FileTime;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Accepted source file, keyed by its logical name in the inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the source root
    pub physical: String,
    /// Modification time of the file (symlinks resolved)
    pub mtime: FileTime,
    /// Whether the file gets transcoded
    pub lossless: bool,
}

/// Normalized view of the source tree
#[derive(Debug, Clone, Default)]
pub struct SourceInventory {
    /// Logical directories needed to hold the accepted files
    pub dirs: BTreeSet<String>,
    /// Logical name (source extension kept) to physical file
    pub files: BTreeMap<String, SourceFile>,
}

impl SourceInventory {
    /// Record an accepted file under its logical name
    pub fn insert(&mut self, logical: String, file: SourceFile) -> Result<()> {
        if let Some(existing) = self.files.get(&logical) {
            return Err(SyncError::NameCollision {
                logical,
                first: existing.physical.clone(),
                second: file.physical,
            });
        }

        self.dirs.extend(path::ancestors(&logical).map(str::to_string));
        self.files.insert(logical, file);
        Ok(())
    }
}

/// Everything currently present below the destination root
#[derive(Debug, Clone, Default)]
pub struct DestInventory {
    pub dirs: BTreeSet<String>,
    /// Relative name to modification time (symlinks not followed)
    pub files: BTreeMap<String, FileTime>,
}

/// Walk the source tree and normalize every accepted file
pub fn scan_source(
    root: &Path,
    filter: &FileFilter,
    access: &mut AccessFilter,
    normalizer: &Normalizer<'_>,
) -> Result<SourceInventory> {
    let mut inventory = SourceInventory::default();
    let mut walker = WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if is_skippable(&err) => {
                warn!("Skipping {}", err);
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        if entry.file_type().is_dir() {
            if !access.accessible(entry.path(), false) {
                debug!("Inaccessible directory {}", entry.path().display());
                walker.skip_current_dir();
            }
            continue;
        }

        let Some(relative) = relative_name(root, &entry) else {
            continue;
        };

        if !filter.accepts(path::file_name(&relative)) {
            continue;
        }

        if !access.accessible(entry.path(), false) {
            debug!("Inaccessible file {}", relative);
            continue;
        }

        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(err) if is_skippable(&err) => {
                warn!("Skipping {}", err);
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let logical = normalizer.normalize(&relative, false, entry.path())?;
        inventory.insert(
            logical,
            SourceFile {
                lossless: is_lossless(&relative),
                physical: relative,
                mtime: FileTime::from_last_modification_time(&meta),
            },
        )?;
    }

    debug!(
        "Source: {} files in {} directories",
        inventory.files.len(),
        inventory.dirs.len()
    );
    Ok(inventory)
}

/// Walk the destination tree without following symlinks
pub fn scan_destination(root: &Path) -> Result<DestInventory> {
    let mut inventory = DestInventory::default();
    if !root.exists() {
        return Ok(inventory);
    }

    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if is_skippable(&err) => continue,
            Err(err) => return Err(err.into()),
        };

        let Some(relative) = relative_name(root, &entry) else {
            continue;
        };

        if entry.file_type().is_dir() {
            inventory.dirs.insert(relative);
        } else {
            let meta = entry.metadata()?;
            inventory
                .files
                .insert(relative, FileTime::from_last_modification_time(&meta));
        }
    }

    debug!(
        "Destination: {} files in {} directories",
        inventory.files.len(),
        inventory.dirs.len()
    );
    Ok(inventory)
}

/// Symlink loops and entries that vanished mid-walk
fn is_skippable(err: &walkdir::Error) -> bool {
    err.loop_ancestor().is_some()
        || err
            .io_error()
            .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
}

fn relative_name(root: &Path, entry: &DirEntry) -> Option<String> {
    let relative = entry.path().strip_prefix(root).ok()?;
    match relative.to_str() {
        Some(name) => Some(name.to_string()),
        None => {
            warn!("Skipping non-UTF-8 name {}", entry.path().display());
            None
        }
    }
}
