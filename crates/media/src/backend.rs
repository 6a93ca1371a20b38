//! The backend used by the `music-transcode` binary

use crate::encoder::ExternalEncoder;
use crate::tags;
use std::path::Path;
use transcode_core::{MediaBackend, Result, TagReader, TagSet, TargetFormat};

/// External encoders plus `lofty` tag access
#[derive(Debug, Clone)]
pub struct AudioBackend {
    encoder: ExternalEncoder,
}

impl AudioBackend {
    pub fn new(format: TargetFormat, quality: f32) -> Self {
        Self::with_encoder(ExternalEncoder::new(format, quality))
    }

    pub fn with_encoder(encoder: ExternalEncoder) -> Self {
        Self { encoder }
    }

    pub fn format(&self) -> TargetFormat {
        self.encoder.format()
    }
}

impl TagReader for AudioBackend {
    fn read_source_tags(&self, path: &Path) -> Result<TagSet> {
        tags::read_flac(path)
    }
}

impl MediaBackend for AudioBackend {
    fn transcode(&self, source: &Path, output: &Path) -> Result<()> {
        self.encoder.encode(source, output)
    }

    fn read_target_tags(&self, path: &Path) -> Result<TagSet> {
        tags::read_encoded(path, self.format())
    }

    fn write_target_tags(&self, path: &Path, tags: &TagSet) -> Result<()> {
        tags::write_encoded(path, self.format(), tags)
    }
}
