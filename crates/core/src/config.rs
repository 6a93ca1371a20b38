//! Run configuration
//!
//! `SyncConfig` is the validated set of options for one run. It is built
//! from defaults, then an optional TOML file (`ConfigFile`), then
//! command-line flags, each layer overriding the previous one.

use crate::error::{Result, SyncError};
use crate::executor::WorkerPool;
use crate::format::{FileFilter, TargetFormat, DEFAULT_EXTENSIONS, DEFAULT_EXTRAS};
use crate::normalize::NamePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options for one mirroring run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Root of the lossless library
    pub source: PathBuf,
    /// Root of the mirrored tree
    pub destination: PathBuf,
    pub format: TargetFormat,
    /// Encoder quality, format default when `None`
    pub quality: Option<f32>,
    /// Skip source entries this user cannot read
    pub user: Option<String>,
    pub policy: NamePolicy,
    /// Round destination times up to even seconds
    pub coarse_time: bool,
    /// Mirror audio files only
    pub exclude_extras: bool,
    /// Worker count, available parallelism when `None`
    pub jobs: Option<usize>,
    /// Audio extensions to mirror
    pub extensions: Vec<String>,
    /// Sidecar file names to mirror
    pub extras: Vec<String>,
    /// Log decisions without mutating the destination
    pub dry_run: bool,
}

impl SyncConfig {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            format: TargetFormat::Ogg,
            quality: None,
            user: None,
            policy: NamePolicy::Identity,
            coarse_time: false,
            exclude_extras: false,
            jobs: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            extras: DEFAULT_EXTRAS.iter().map(|s| s.to_string()).collect(),
            dry_run: false,
        }
    }

    /// Effective encoder quality
    pub fn quality(&self) -> f32 {
        self.quality.unwrap_or_else(|| self.format.default_quality())
    }

    pub fn file_filter(&self) -> FileFilter {
        FileFilter::new(&self.extensions, &self.extras, self.exclude_extras)
    }

    pub fn worker_pool(&self) -> WorkerPool {
        match self.jobs {
            Some(jobs) => WorkerPool::new(jobs),
            None => WorkerPool::with_available_parallelism(),
        }
    }

    /// Check option values (paths are checked when the run starts)
    pub fn validate(&self) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            return Err(SyncError::Config("source path is empty".to_string()));
        }
        if self.destination.as_os_str().is_empty() {
            return Err(SyncError::Config("destination path is empty".to_string()));
        }
        if self.source == self.destination {
            return Err(SyncError::Config(
                "source and destination are the same path".to_string(),
            ));
        }

        let (min, max) = self.format.quality_range();
        let quality = self.quality();
        if !(min..=max).contains(&quality) {
            return Err(SyncError::Config(format!(
                "quality {} out of range {}..={} for {}",
                quality, min, max, self.format
            )));
        }

        if self.jobs == Some(0) {
            return Err(SyncError::Config("jobs must be at least 1".to_string()));
        }

        if self.extensions.is_empty() {
            return Err(SyncError::Config("no audio extensions configured".to_string()));
        }
        if let Some(ext) = self.extensions.iter().find(|e| e.is_empty() || e.contains(['.', '/'])) {
            return Err(SyncError::Config(format!("invalid extension {:?}", ext)));
        }

        if let Some(user) = &self.user {
            if user.is_empty() {
                return Err(SyncError::Config("user name is empty".to_string()));
            }
        }

        Ok(())
    }
}

/// Settings file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub format: Option<TargetFormat>,
    pub quality: Option<f32>,
    pub user: Option<String>,
    pub policy: Option<NamePolicy>,
    pub coarse_time: Option<bool>,
    pub exclude_extras: Option<bool>,
    pub jobs: Option<usize>,
    pub extensions: Option<Vec<String>>,
    pub extras: Option<Vec<String>>,
}

impl ConfigFile {
    /// Load a TOML settings file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        Self::parse(&text).map_err(|e| match e {
            SyncError::Config(msg) => SyncError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Overlay the keys present in the file onto `config`
    pub fn apply(self, config: &mut SyncConfig) {
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(destination) = self.destination {
            config.destination = destination;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.quality.is_some() {
            config.quality = self.quality;
        }
        if self.user.is_some() {
            config.user = self.user;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(coarse_time) = self.coarse_time {
            config.coarse_time = coarse_time;
        }
        if let Some(exclude_extras) = self.exclude_extras {
            config.exclude_extras = exclude_extras;
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        if let Some(extensions) = self.extensions {
            config.extensions = extensions;
        }
        if let Some(extras) = self.extras {
            config.extras = extras;
        }
    }

    /// Annotated example file
    pub fn example() -> &'static str {
        r#"# music-transcode settings
source = "/srv/music/flac"
destination = "/srv/music/portable"

# ogg (quality -1..10) or opus (bitrate 6..256 kbit/s)
format = "ogg"
quality = 6

# Only mirror files this user can read
# user = "media"

# identity, rewrite or android-safe
policy = "identity"

# Round times to even seconds (FAT/exFAT destinations)
coarse_time = false

exclude_extras = false
# jobs = 4
extensions = ["flac", "mp3", "ogg", "m4a", "opus"]
extras = ["cover.jpg"]
"#
    }
}
