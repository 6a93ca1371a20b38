//! Tag sets and the media collaborator seam

use crate::error::Result;
use crate::format::TargetFormat;
use std::collections::BTreeMap;
use std::path::Path;

/// Key to values mapping read from an audio file
///
/// Keys are stored upper-case (Vorbis comment keys are case-insensitive).
/// Values keep their order for writing; equality ignores value order.
#[derive(Debug, Clone, Default)]
pub struct TagSet {
    items: BTreeMap<String, Vec<String>>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut set = Self::new();
        for (key, value) in pairs {
            set.push(key.as_ref(), value);
        }
        set
    }

    /// Append a value to a key
    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.items
            .entry(key.to_ascii_uppercase())
            .or_default()
            .push(value.into());
    }

    /// First value of a key
    pub fn first(&self, key: &str) -> Option<&str> {
        self.items
            .get(&key.to_ascii_uppercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All `(key, value)` pairs in key order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// Copy without the keys a target format cannot carry
    pub fn for_format(&self, format: TargetFormat) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|(k, _)| !format.excludes_tag(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    fn sorted_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<_> = self.pairs().collect();
        pairs.sort_unstable();
        pairs
    }
}

impl PartialEq for TagSet {
    fn eq(&self, other: &Self) -> bool {
        self.sorted_pairs() == other.sorted_pairs()
    }
}

impl Eq for TagSet {}

/// Reads tags from lossless source files
pub trait TagReader {
    fn read_source_tags(&self, path: &Path) -> Result<TagSet>;
}

/// External collaborators used by the mutation phase
///
/// Implementations are shared by all workers.
pub trait MediaBackend: TagReader + Sync {
    /// Encode `source` into the target format at `output`
    fn transcode(&self, source: &Path, output: &Path) -> Result<()>;

    /// Read the tags of an encoded file
    fn read_target_tags(&self, path: &Path) -> Result<TagSet>;

    /// Replace all tags of an encoded file in place
    ///
    /// Only ever called on a temporary copy.
    fn write_target_tags(&self, path: &Path, tags: &TagSet) -> Result<()>;
}
