//! Relative path helpers
//!
//! Every entry in an inventory is a `/`-separated path relative to its tree
//! root. Before anything touches the filesystem the name must be in safe
//! form: no absolute prefix, no `.`/`..` segments, no trailing separator.

use crate::error::{Result, SyncError};

/// Check whether a relative name is in safe form
pub fn is_safe(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }

    if name.starts_with('/') || name.starts_with("./") || name.starts_with("../") {
        return false;
    }

    if name.contains("/./") || name.contains("/../") || name.contains("//") {
        return false;
    }

    !(name.ends_with('/') || name.ends_with("/.") || name.ends_with("/.."))
}

/// Reject a name that is not in safe form
pub fn ensure_safe(name: &str) -> Result<()> {
    if is_safe(name) {
        Ok(())
    } else {
        Err(SyncError::UnsafePath(name.to_string()))
    }
}

/// Split off the extension of the last segment (`"a/b.flac"` -> `("a/b", "flac")`)
pub fn split_extension(name: &str) -> Option<(&str, &str)> {
    let base_start = name.rfind('/').map_or(0, |i| i + 1);
    let dot = name[base_start..].rfind('.')? + base_start;
    if dot == base_start {
        // ".hidden" has no extension
        return None;
    }
    Some((&name[..dot], &name[dot + 1..]))
}

/// Extension of the last segment, if any
pub fn extension(name: &str) -> Option<&str> {
    split_extension(name).map(|(_, ext)| ext)
}

/// Replace the extension of the last segment
pub fn with_extension(name: &str, ext: &str) -> String {
    match split_extension(name) {
        Some((stem, _)) => format!("{}.{}", stem, ext),
        None => format!("{}.{}", name, ext),
    }
}

/// Last segment of a relative name
pub fn file_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Parent of a relative name, `None` at the tree root
pub fn parent(name: &str) -> Option<&str> {
    name.rfind('/').map(|i| &name[..i])
}

/// Iterate over the proper ancestors of a relative name, nearest first
pub fn ancestors(name: &str) -> impl Iterator<Item = &str> {
    let mut current = parent(name);
    std::iter::from_fn(move || {
        let next = current?;
        current = parent(next);
        Some(next)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_names() {
        assert!(is_safe("a"));
        assert!(is_safe("Album/01 Track.flac"));
        assert!(is_safe("a/.hidden"));
        assert!(is_safe("a/..b"));
    }

    #[test]
    fn test_unsafe_names() {
        for name in [
            "", ".", "..", "/etc/passwd", "./a", "../a", "a/./b", "a/../b", "a/", "a/.", "a/..",
            "a//b",
        ] {
            assert!(!is_safe(name), "{:?} should be unsafe", name);
            assert!(matches!(ensure_safe(name), Err(SyncError::UnsafePath(_))));
        }
    }

    #[test]
    fn test_extension_helpers() {
        assert_eq!(split_extension("a/b.flac"), Some(("a/b", "flac")));
        assert_eq!(split_extension("a.b/c"), None);
        assert_eq!(split_extension("a/.cover"), None);
        assert_eq!(with_extension("Album/01 Track.flac", "ogg"), "Album/01 Track.ogg");
        assert_eq!(with_extension("x.tar.gz", "ogg"), "x.tar.ogg");
        assert_eq!(file_name("a/b/c.ogg"), "c.ogg");
        assert_eq!(file_name("c.ogg"), "c.ogg");
    }

    #[test]
    fn test_ancestors() {
        let all: Vec<_> = ancestors("a/b/c.flac").collect();
        assert_eq!(all, vec!["a/b", "a"]);
        assert_eq!(ancestors("c.flac").count(), 0);
        assert_eq!(parent("a/b"), Some("a"));
    }
}
