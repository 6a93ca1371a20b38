//! music-transcode - mirror a FLAC library as a lossy copy

use anyhow::{bail, Context, Result};
use clap::Parser;
use media::AudioBackend;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use transcode_core::{ConfigFile, NamePolicy, SyncConfig, TargetFormat};

mod summary;

const NAME_LIMITATIONS: &str = "\
Names that are not valid UTF-8 are not mirrored: such source entries are
skipped with a warning, and such destination entries are never deleted.";

/// Convert music from FLAC to a lower bitrate format
#[derive(Parser, Debug)]
#[command(name = "music-transcode")]
#[command(author, version, about, long_about = None)]
#[command(after_long_help = NAME_LIMITATIONS)]
struct Cli {
    /// Source path
    #[arg(long, value_name = "PATH")]
    src: Option<PathBuf>,

    /// Destination path
    #[arg(long, value_name = "PATH")]
    dst: Option<PathBuf>,

    /// Ignore source files that are not accessible by USER
    #[arg(long, value_name = "USER")]
    user: Option<String>,

    /// Target format (ogg or opus)
    #[arg(long)]
    format: Option<TargetFormat>,

    /// Encoder quality (ogg: -1..10, opus: bitrate 6..256)
    #[arg(long, allow_negative_numbers = true)]
    quality: Option<f32>,

    /// Rename files to plain ASCII, naming FLAC files from their tags
    #[arg(long, conflicts_with = "android_safe")]
    rewrite_names: bool,

    /// Replace characters FAT/exFAT storage rejects
    #[arg(long)]
    android_safe: bool,

    /// Round destination times up to even seconds
    #[arg(long)]
    coarse_time: bool,

    /// Mirror audio files only (no cover art)
    #[arg(long)]
    no_extras: bool,

    /// Number of worker threads (default: available parallelism)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Settings file (TOML); flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log what would change without touching the destination
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Print an example settings file and exit
    #[arg(long)]
    print_config: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Defaults, then the settings file, then flags
    fn sync_config(&self) -> Result<SyncConfig> {
        let mut config = SyncConfig::new(PathBuf::new(), PathBuf::new());

        if let Some(path) = &self.config {
            ConfigFile::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?
                .apply(&mut config);
        }

        if let Some(src) = &self.src {
            config.source = src.clone();
        }
        if let Some(dst) = &self.dst {
            config.destination = dst.clone();
        }
        if config.source.as_os_str().is_empty() {
            bail!("No source given (use --src or `source` in the settings file)");
        }
        if config.destination.as_os_str().is_empty() {
            bail!("No destination given (use --dst or `destination` in the settings file)");
        }

        if let Some(format) = self.format {
            config.format = format;
        }
        if self.quality.is_some() {
            config.quality = self.quality;
        }
        if self.user.is_some() {
            config.user = self.user.clone();
        }
        if self.rewrite_names {
            config.policy = NamePolicy::Rewrite;
        } else if self.android_safe {
            config.policy = NamePolicy::AndroidSafe;
        }
        if self.coarse_time {
            config.coarse_time = true;
        }
        if self.no_extras {
            config.exclude_extras = true;
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        config.dry_run = self.dry_run;

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", ConfigFile::example());
        return Ok(());
    }

    init_logging(cli.verbose);

    let config = cli.sync_config()?;
    debug!(?config, "settings");
    let backend = AudioBackend::new(config.format, config.quality());

    let report = transcode_core::run(&config, &backend).with_context(|| {
        format!(
            "Failed to mirror {} into {}",
            config.source.display(),
            config.destination.display()
        )
    })?;

    summary::print(&report, config.dry_run);
    Ok(())
}
