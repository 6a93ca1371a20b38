//! Flag and settings-file handling

use crate::common::TestLibrary;
use crate::transcode;
use anyhow::Result;
use std::fs;

#[test]
fn test_conflicting_policies_fail() -> Result<()> {
    let lib = TestLibrary::new();
    lib.command(&["--rewrite-names", "--android-safe"]).assert_failure()?;
    assert!(!lib.dst().exists());
    Ok(())
}

#[test]
fn test_invalid_quality_fails() -> Result<()> {
    let lib = TestLibrary::new();
    let result = lib.command(&["--format", "opus", "--quality", "500"]).assert_failure()?;
    assert!(result.contains_stderr("quality"));
    Ok(())
}

#[test]
fn test_unknown_format_fails() -> Result<()> {
    let lib = TestLibrary::new();
    lib.command(&["--format", "wav"]).assert_failure()?;
    Ok(())
}

#[test]
fn test_paths_from_settings_file() -> Result<()> {
    let lib = TestLibrary::new();
    lib.add("Album/a.mp3", b"a");
    fs::write(
        lib.root().join("settings.toml"),
        format!(
            "source = {:?}\ndestination = {:?}\nextras = []\n",
            lib.src().display().to_string(),
            lib.dst().display().to_string()
        ),
    )?;

    transcode!(lib.root(), "--config", "settings.toml").assert_success()?;

    assert_eq!(lib.dst_files(), ["Album/a.mp3"]);
    Ok(())
}

#[test]
fn test_unknown_settings_key_fails() -> Result<()> {
    let lib = TestLibrary::new();
    fs::write(lib.root().join("settings.toml"), "colour = \"blue\"\n")?;

    let result = transcode!(lib.root(), "--config", "settings.toml").assert_failure()?;
    assert!(result.contains_stderr("settings.toml"));
    Ok(())
}

#[test]
fn test_print_config() -> Result<()> {
    let lib = TestLibrary::new();
    let result = transcode!(lib.root(), "--print-config").assert_success()?;
    assert!(result.contains_stdout("destination ="));
    Ok(())
}
