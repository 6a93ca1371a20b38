//! Vorbis comment access through `lofty`

use lofty::config::{ParseOptions, WriteOptions};
use lofty::error::LoftyError;
use lofty::file::AudioFile;
use lofty::flac::FlacFile;
use lofty::ogg::{OpusFile, VorbisComments, VorbisFile};
use lofty::tag::TagExt;
use std::fs::File;
use std::path::Path;
use transcode_core::{Result, SyncError, TagSet, TargetFormat};

/// Tags only; audio properties are never needed
fn parse_options() -> ParseOptions {
    ParseOptions::new().read_properties(false)
}

fn metadata_error(path: &Path, err: LoftyError) -> SyncError {
    SyncError::Metadata {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| SyncError::io(path, e))
}

fn to_tag_set(comments: &VorbisComments) -> TagSet {
    TagSet::from_pairs(comments.items())
}

/// Vorbis comments of a FLAC file (empty if it has none)
pub fn read_flac(path: &Path) -> Result<TagSet> {
    let file = FlacFile::read_from(&mut open(path)?, parse_options())
        .map_err(|e| metadata_error(path, e))?;
    Ok(file.vorbis_comments().map(to_tag_set).unwrap_or_default())
}

/// Comment header of an encoded file
pub fn read_encoded(path: &Path, format: TargetFormat) -> Result<TagSet> {
    read_comments(path, format).map(|comments| to_tag_set(&comments))
}

fn read_comments(path: &Path, format: TargetFormat) -> Result<VorbisComments> {
    let mut reader = open(path)?;
    let comments = match format {
        TargetFormat::Ogg => VorbisFile::read_from(&mut reader, parse_options())
            .map(|file| file.vorbis_comments().clone()),
        TargetFormat::Opus => OpusFile::read_from(&mut reader, parse_options())
            .map(|file| file.vorbis_comments().clone()),
    };
    comments.map_err(|e| metadata_error(path, e))
}

/// Replace every comment of an encoded file with `tags`
///
/// The encoder's vendor string is preserved.
pub fn write_encoded(path: &Path, format: TargetFormat, tags: &TagSet) -> Result<()> {
    let existing = read_comments(path, format)?;

    let mut comments = VorbisComments::default();
    comments.set_vendor(existing.vendor().to_string());
    for (key, value) in tags.pairs() {
        comments.push(key.to_string(), value.to_string());
    }

    comments
        .save_to_path(path, WriteOptions::default())
        .map_err(|e| metadata_error(path, e))
}
