//! Permission-aware source filtering
//!
//! Answers whether a path would be readable by a configured user, walking
//! every ancestor and resolving symlinks. Results are cached per
//! `(path, as_target)` for the lifetime of one filter, which is created
//! fresh for each run.

use crate::error::{Result, SyncError};
use nix::unistd::{Gid, User};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tracing::debug;

const READ: u32 = 0o4;
const EXECUTE: u32 = 0o1;

/// Numeric identity of the user the destination is prepared for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub uid: u32,
    /// Primary and supplementary groups
    pub gids: HashSet<u32>,
}

impl UserIdentity {
    pub fn new(uid: u32, gids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            uid,
            gids: gids.into_iter().collect(),
        }
    }

    /// Resolve a user name through the system user and group databases
    pub fn lookup(name: &str) -> Result<Self> {
        let user = User::from_name(name)?.ok_or_else(|| SyncError::UnknownUser(name.to_string()))?;
        let groups = supplementary_groups(&user)?;

        let mut gids: HashSet<u32> = groups.into_iter().map(Gid::as_raw).collect();
        gids.insert(user.gid.as_raw());

        debug!("User {} has uid {} and {} groups", name, user.uid, gids.len());
        Ok(Self {
            uid: user.uid.as_raw(),
            gids,
        })
    }

    fn class_of(&self, uid: u32, gid: u32) -> PermClass {
        if uid == self.uid {
            PermClass::Owner
        } else if self.gids.contains(&gid) {
            PermClass::Group
        } else {
            PermClass::Other
        }
    }
}

#[cfg(not(target_os = "macos"))]
fn supplementary_groups(user: &User) -> Result<Vec<Gid>> {
    let name = std::ffi::CString::new(user.name.as_str())
        .map_err(|_| SyncError::UnknownUser(user.name.clone()))?;
    Ok(nix::unistd::getgrouplist(&name, user.gid)?)
}

#[cfg(target_os = "macos")]
fn supplementary_groups(_user: &User) -> Result<Vec<Gid>> {
    Ok(Vec::new())
}

/// Permission class a user falls into for one inode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermClass {
    Owner,
    Group,
    Other,
}

impl PermClass {
    fn shift(self) -> u32 {
        match self {
            Self::Owner => 6,
            Self::Group => 3,
            Self::Other => 0,
        }
    }

    /// Check that every bit in `needed` (`READ`/`EXECUTE`) is granted
    fn permits(self, mode: u32, needed: u32) -> bool {
        let bits = needed << self.shift();
        mode & bits == bits
    }
}

/// Memoizing accessibility check for one scan
pub struct AccessFilter {
    /// `None` disables filtering
    checker: Option<PermissionChecker>,
}

impl AccessFilter {
    pub fn new(identity: Option<UserIdentity>, root: &Path) -> Self {
        Self {
            checker: identity.map(|identity| PermissionChecker {
                identity,
                root_len: root.as_os_str().len(),
                cache: HashMap::new(),
            }),
        }
    }

    /// Filter that accepts everything
    pub fn disabled() -> Self {
        Self { checker: None }
    }

    /// Check whether `path` is accessible
    ///
    /// `as_target` marks the final object of a traversal (a symlink
    /// target), which only needs search permission if it is a directory.
    pub fn accessible(&mut self, path: &Path, as_target: bool) -> bool {
        match self.checker.as_mut() {
            Some(checker) => checker.check(path, as_target),
            None => true,
        }
    }
}

struct PermissionChecker {
    identity: UserIdentity,
    /// Length of the scanned root; directories up to here only need search permission
    root_len: usize,
    cache: HashMap<(PathBuf, bool), bool>,
}

impl PermissionChecker {
    fn check(&mut self, path: &Path, as_target: bool) -> bool {
        let key = (path.to_path_buf(), as_target);
        if let Some(&known) = self.cache.get(&key) {
            return known;
        }

        // Provisional entry: a symlink cycle resolves to inaccessible
        self.cache.insert(key.clone(), false);
        let result = self.evaluate(path, as_target);
        self.cache.insert(key, result);
        result
    }

    fn evaluate(&mut self, path: &Path, as_target: bool) -> bool {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !self.check(parent, as_target) {
                return false;
            }
        }

        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(_) => return false,
        };

        if meta.file_type().is_symlink() {
            return match fs::read_link(path) {
                Ok(target) => {
                    let resolved = match path.parent() {
                        Some(parent) => parent.join(target),
                        None => target,
                    };
                    self.check(&resolved, true)
                }
                Err(_) => false,
            };
        }

        let class = self.identity.class_of(meta.uid(), meta.gid());
        if meta.is_dir() {
            if as_target || path.as_os_str().len() <= self.root_len {
                class.permits(meta.mode(), EXECUTE)
            } else {
                class.permits(meta.mode(), READ | EXECUTE)
            }
        } else {
            class.permits(meta.mode(), READ)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::{symlink, PermissionsExt};
    use tempfile::TempDir;

    fn chmod(path: &Path, mode: u32) {
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    fn current_user() -> UserIdentity {
        UserIdentity::new(nix::unistd::getuid().as_raw(), [nix::unistd::getgid().as_raw()])
    }

    #[test]
    fn test_perm_class_bits() {
        assert!(PermClass::Owner.permits(0o700, READ | EXECUTE));
        assert!(!PermClass::Owner.permits(0o600, READ | EXECUTE));
        assert!(PermClass::Group.permits(0o050, READ | EXECUTE));
        assert!(!PermClass::Group.permits(0o705, READ));
        assert!(PermClass::Other.permits(0o001, EXECUTE));
        assert!(!PermClass::Other.permits(0o770, READ));
    }

    #[test]
    fn test_class_selection() {
        let identity = UserIdentity::new(1000, [100, 200]);
        assert_eq!(identity.class_of(1000, 5), PermClass::Owner);
        assert_eq!(identity.class_of(1001, 200), PermClass::Group);
        assert_eq!(identity.class_of(1001, 300), PermClass::Other);
    }

    #[test]
    fn test_disabled_filter_accepts_everything() {
        let mut filter = AccessFilter::disabled();
        assert!(filter.accessible(Path::new("/nonexistent/path"), false));
    }

    #[test]
    fn test_readable_file_and_unreadable_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let album = root.join("album");
        fs::create_dir(&album).unwrap();
        fs::write(album.join("a.flac"), b"a").unwrap();
        fs::write(album.join("b.flac"), b"b").unwrap();
        chmod(&album.join("b.flac"), 0o200);

        let mut filter = AccessFilter::new(Some(current_user()), root);
        assert!(filter.accessible(&album.join("a.flac"), false));
        assert!(!filter.accessible(&album.join("b.flac"), false));
    }

    #[test]
    fn test_subdirectory_needs_read_and_execute() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let hidden = root.join("hidden");
        fs::create_dir(&hidden).unwrap();
        fs::write(hidden.join("a.flac"), b"a").unwrap();
        chmod(&hidden, 0o100);

        let mut filter = AccessFilter::new(Some(current_user()), root);
        assert!(!filter.accessible(&hidden, false));
        assert!(!filter.accessible(&hidden.join("a.flac"), false));

        // Reached through a symlink the directory is a target and only needs search permission
        assert!(filter.accessible(&hidden, true));

        chmod(&hidden, 0o700);
    }

    #[test]
    fn test_symlink_follows_target() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("real.flac"), b"a").unwrap();
        fs::write(root.join("secret.flac"), b"b").unwrap();
        chmod(&root.join("secret.flac"), 0o000);
        symlink("real.flac", root.join("link.flac")).unwrap();
        symlink("secret.flac", root.join("bad.flac")).unwrap();
        symlink("missing.flac", root.join("dangling.flac")).unwrap();

        let mut filter = AccessFilter::new(Some(current_user()), root);
        assert!(filter.accessible(&root.join("link.flac"), false));
        assert!(!filter.accessible(&root.join("bad.flac"), false));
        assert!(!filter.accessible(&root.join("dangling.flac"), false));
    }

    #[test]
    fn test_symlink_cycle_is_inaccessible() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        symlink("b", root.join("a")).unwrap();
        symlink("a", root.join("b")).unwrap();

        let mut filter = AccessFilter::new(Some(current_user()), root);
        assert!(!filter.accessible(&root.join("a"), false));
    }

    #[test]
    fn test_missing_path_is_inaccessible() {
        let temp_dir = TempDir::new().unwrap();
        let mut filter = AccessFilter::new(Some(current_user()), temp_dir.path());
        assert!(!filter.accessible(&temp_dir.path().join("gone.flac"), false));
    }
}
