//! Logical name mapping
//!
//! Maps a physical source-relative path to the destination-relative
//! (logical) path under one of three policies. The policy is chosen once
//! from configuration; everything downstream only sees logical names.

use crate::error::{Result, SyncError};
use crate::format::is_lossless;
use crate::path;
use crate::tags::{TagReader, TagSet};
use deunicode::deunicode_with_tofu;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lexical substitutions applied before transliteration
///
/// Names whose stylised glyphs transliterate into something unreadable.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("Ke$ha", "Kesha"),
    ("A$AP", "ASAP"),
    ("P!nk", "Pink"),
    ("†‡†", "Crosses"),
    ("✝✝✝", "Crosses"),
];

/// Punctuation kept by the rewrite policy (besides ASCII alphanumerics)
const REWRITE_PUNCTUATION: &str = "&'(),.-_ ";

/// Characters reserved on FAT/exFAT media
const ANDROID_RESERVED: &str = "\"*:<>?\\|";

/// Naming policy for destination entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamePolicy {
    /// Keep source names unchanged
    #[default]
    Identity,
    /// Transliterate to a restricted ASCII set; lossless files are named from their tags
    Rewrite,
    /// Replace only characters that removable media filesystems reject
    AndroidSafe,
}

/// Computes logical names for source entries
pub struct Normalizer<'a> {
    policy: NamePolicy,
    tags: &'a dyn TagReader,
}

impl<'a> Normalizer<'a> {
    pub fn new(policy: NamePolicy, tags: &'a dyn TagReader) -> Self {
        Self { policy, tags }
    }

    /// Logical name of a source entry
    ///
    /// `source` is the absolute path of the entry, used to read tags when
    /// the rewrite policy names a lossless file after its title.
    pub fn normalize(&self, relative: &str, is_dir: bool, source: &Path) -> Result<String> {
        match self.policy {
            NamePolicy::Identity => Ok(relative.to_string()),
            NamePolicy::AndroidSafe => Ok(android_safe(relative)),
            NamePolicy::Rewrite => self.rewrite(relative, is_dir, source),
        }
    }

    fn rewrite(&self, relative: &str, is_dir: bool, source: &Path) -> Result<String> {
        if is_dir {
            return rewrite_dir(relative);
        }

        let name = path::file_name(relative);
        let file = if is_lossless(name) {
            let tags = self.tags.read_source_tags(source)?;
            let title = rewrite_segment(&track_title(&tags, source)?, false)?;
            match path::extension(name) {
                Some(ext) => format!("{}.{}", title, ext),
                None => title,
            }
        } else {
            rewrite_segment(name, false)?
        };

        match path::parent(relative) {
            Some(parent) => Ok(format!("{}/{}", rewrite_dir(parent)?, file)),
            None => Ok(file),
        }
    }
}

/// File title built from disc number, track number and title tags
///
/// `DISCNUMBER=1, TRACKNUMBER=3, TITLE=a/b` becomes `01.03 a-b`.
pub fn track_title(tags: &TagSet, source: &Path) -> Result<String> {
    let title = tags
        .first("TITLE")
        .filter(|title| !title.trim().is_empty())
        .ok_or_else(|| SyncError::MissingTag {
        path: source.to_path_buf(),
        tag: "TITLE",
    })?;

    let mut name = String::new();
    if let Some(disc) = tags.first("DISCNUMBER") {
        name.push_str(&pad_number(disc));
        name.push('.');
    }
    if let Some(track) = tags.first("TRACKNUMBER") {
        name.push_str(&pad_number(track));
    }
    if !name.is_empty() {
        name.push(' ');
    }
    name.push_str(&title.replace('/', "-"));
    Ok(name)
}

/// `"3"` -> `"03"`, `"3/12"` -> `"03"`; non-numeric values pass through trimmed
fn pad_number(value: &str) -> String {
    let number = value.split('/').next().unwrap_or(value).trim();
    match number.parse::<u32>() {
        Ok(n) => format!("{:02}", n),
        Err(_) => number.to_string(),
    }
}

fn rewrite_dir(relative: &str) -> Result<String> {
    let segments = relative
        .split('/')
        .map(|segment| rewrite_segment(segment, true))
        .collect::<Result<Vec<_>>>()?;
    Ok(segments.join("/"))
}

fn rewrite_segment(segment: &str, is_dir: bool) -> Result<String> {
    let mut substituted = segment.to_string();
    for (from, to) in SUBSTITUTIONS {
        substituted = substituted.replace(from, to);
    }

    let ascii = deunicode_with_tofu(&substituted, "_").replace('/', "_");
    let trimmed = ascii.trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(SyncError::EmptySegment(segment.to_string()));
    }

    Ok(trimmed
        .chars()
        .map(|c| if rewrite_allows(c, is_dir) { c } else { '_' })
        .collect())
}

fn rewrite_allows(c: char, is_dir: bool) -> bool {
    c.is_ascii_alphanumeric() || REWRITE_PUNCTUATION.contains(c) || (is_dir && c == '/')
}

/// Replace characters that FAT-style filesystems reject
///
/// `:` and `?` get look-alikes so names stay readable.
pub fn android_safe(relative: &str) -> String {
    relative
        .chars()
        .map(|c| match c {
            ':' => '\u{A789}',
            '?' => '\u{FF1F}',
            c if ANDROID_RESERVED.contains(c) => '_',
            c => c,
        })
        .collect()
}
