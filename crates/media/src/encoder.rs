//! External encoder invocation

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;
use transcode_core::{Result, SyncError, TargetFormat};

/// Runs `oggenc` or `opusenc` for one file
///
/// Source comments are discarded by the encoder; tags are written
/// separately afterwards so both formats are handled alike.
#[derive(Debug, Clone)]
pub struct ExternalEncoder {
    format: TargetFormat,
    quality: f32,
    program: OsString,
}

impl ExternalEncoder {
    pub fn new(format: TargetFormat, quality: f32) -> Self {
        Self {
            format,
            quality,
            program: OsString::from(Self::default_program(format)),
        }
    }

    /// Use a different encoder executable
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    pub fn default_program(format: TargetFormat) -> &'static str {
        match format {
            TargetFormat::Ogg => "oggenc",
            TargetFormat::Opus => "opusenc",
        }
    }

    pub fn format(&self) -> TargetFormat {
        self.format
    }

    /// Command line for encoding `source` into `output`
    pub fn command(&self, source: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        match self.format {
            TargetFormat::Ogg => {
                let mut target = OsString::from("--output=");
                target.push(output);
                command
                    .arg("--quality")
                    .arg(self.quality.to_string())
                    .args(["--discard-comments", "--quiet"])
                    .arg(target)
                    .arg("--")
                    .arg(source);
            }
            TargetFormat::Opus => {
                command
                    .arg("--bitrate")
                    .arg(self.quality.to_string())
                    .args(["--discard-comments", "--quiet"])
                    .arg(source)
                    .arg(output);
            }
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }

    /// Encode `source` into `output`
    pub fn encode(&self, source: &Path, output: &Path) -> Result<()> {
        let mut command = self.command(source, output);
        debug!(?command, "encode");

        let result = command.output().map_err(|e| SyncError::Encoder {
            path: source.to_path_buf(),
            message: format!("failed to run {}: {}", self.program.to_string_lossy(), e),
        })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SyncError::Encoder {
                path: source.to_path_buf(),
                message: format!("{} ({})", stderr.trim(), result.status),
            });
        }
        Ok(())
    }
}
