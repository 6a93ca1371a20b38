//! Target audio formats and file classification

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Extension of lossless source files that get transcoded
pub const LOSSLESS_EXTENSION: &str = "flac";

/// Audio extensions mirrored by default
pub const DEFAULT_EXTENSIONS: &[&str] = &["flac", "mp3", "ogg", "m4a", "opus"];

/// Sidecar file names mirrored by default
pub const DEFAULT_EXTRAS: &[&str] = &["cover.jpg"];

/// Lossy format the destination tree stores transcoded audio in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// Ogg Vorbis (`oggenc`)
    Ogg,
    /// Ogg Opus (`opusenc`)
    Opus,
}

impl TargetFormat {
    /// Filename extension of encoded files
    pub fn extension(self) -> &'static str {
        match self {
            Self::Ogg => "ogg",
            Self::Opus => "opus",
        }
    }

    /// Encoder quality used when none is configured
    ///
    /// Vorbis quality level for `ogg`, bitrate in kbit/s for `opus`.
    pub fn default_quality(self) -> f32 {
        match self {
            Self::Ogg => 6.0,
            Self::Opus => 128.0,
        }
    }

    /// Accepted quality range (inclusive)
    pub fn quality_range(self) -> (f32, f32) {
        match self {
            Self::Ogg => (-1.0, 10.0),
            Self::Opus => (6.0, 256.0),
        }
    }

    /// Whether a tag key is left out of tag comparison and writing
    ///
    /// Opus applies gain through its header and R128 tags, so ReplayGain
    /// values copied from the source would be misleading.
    pub fn excludes_tag(self, key: &str) -> bool {
        match self {
            Self::Ogg => false,
            Self::Opus => key.to_ascii_uppercase().starts_with("REPLAYGAIN_"),
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ogg" | "vorbis" => Ok(Self::Ogg),
            "opus" => Ok(Self::Opus),
            other => Err(SyncError::Config(format!("unknown target format {:?}", other))),
        }
    }
}

/// Decides which source files take part in mirroring
#[derive(Debug, Clone)]
pub struct FileFilter {
    extensions: Vec<String>,
    extras: Vec<String>,
    exclude_extras: bool,
}

impl FileFilter {
    pub fn new(extensions: &[String], extras: &[String], exclude_extras: bool) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            extras: extras.to_vec(),
            exclude_extras,
        }
    }

    /// Check a file name (last segment only)
    pub fn accepts(&self, file_name: &str) -> bool {
        if let Some(ext) = crate::path::extension(file_name) {
            let ext = ext.to_ascii_lowercase();
            if self.extensions.iter().any(|e| *e == ext) {
                return true;
            }
        }

        !self.exclude_extras && self.extras.iter().any(|e| e == file_name)
    }
}

/// Whether a relative name refers to a lossless source file
pub fn is_lossless(name: &str) -> bool {
    crate::path::extension(name).is_some_and(|ext| ext.eq_ignore_ascii_case(LOSSLESS_EXTENSION))
}
