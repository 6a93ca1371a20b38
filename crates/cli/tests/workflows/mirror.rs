//! Mirroring runs through the binary

use crate::common::TestLibrary;
use anyhow::Result;
use std::fs;

#[test]
fn test_copies_audio_and_cover_art() -> Result<()> {
    let lib = TestLibrary::new();
    lib.add("Artist/Album/01 Song.mp3", b"mp3 data");
    lib.add("Artist/Album/cover.jpg", b"jpeg data");
    lib.add("Artist/Album/notes.txt", b"ignored");

    let result = lib.command(&[]).assert_success()?;

    assert_eq!(
        lib.dst_files(),
        ["Artist/Album/01 Song.mp3", "Artist/Album/cover.jpg"]
    );
    assert_eq!(fs::read(lib.dst().join("Artist/Album/01 Song.mp3"))?, b"mp3 data");
    assert!(result.contains_stdout("Files copied"));
    Ok(())
}

#[test]
fn test_second_run_is_up_to_date() -> Result<()> {
    let lib = TestLibrary::new();
    lib.add("Album/a.mp3", b"a");

    lib.command(&[]).assert_success()?;
    let second = lib.command(&[]).assert_success()?;

    assert!(second.contains_stdout("Destination is up to date"));
    Ok(())
}

#[test]
fn test_orphans_are_deleted() -> Result<()> {
    let lib = TestLibrary::new();
    lib.add("Album/a.mp3", b"a");
    lib.command(&[]).assert_success()?;

    fs::create_dir_all(lib.dst().join("Gone"))?;
    fs::write(lib.dst().join("Gone/old.ogg"), b"old")?;
    fs::write(lib.dst().join("Album/old.ogg"), b"old")?;

    lib.command(&[]).assert_success()?;

    assert_eq!(lib.dst_files(), ["Album/a.mp3"]);
    assert!(!lib.dst().join("Gone").exists());
    Ok(())
}

#[test]
fn test_no_extras_skips_cover_art() -> Result<()> {
    let lib = TestLibrary::new();
    lib.add("Album/a.m4a", b"a");
    lib.add("Album/cover.jpg", b"jpeg");

    lib.command(&["--no-extras"]).assert_success()?;

    assert_eq!(lib.dst_files(), ["Album/a.m4a"]);
    Ok(())
}

#[test]
fn test_android_safe_names() -> Result<()> {
    let lib = TestLibrary::new();
    lib.add("Live: 1999/What?.mp3", b"a");

    lib.command(&["--android-safe"]).assert_success()?;

    assert_eq!(lib.dst_files(), ["Live\u{A789} 1999/What\u{FF1F}.mp3"]);
    Ok(())
}

#[test]
fn test_dry_run_leaves_destination_alone() -> Result<()> {
    let lib = TestLibrary::new();
    lib.add("Album/a.flac", b"not decoded in a dry run");
    lib.add("Album/b.mp3", b"b");

    let result = lib.command(&["--dry-run"]).assert_success()?;

    assert!(!lib.dst().exists());
    assert!(result.contains_stdout("Dry run"));
    assert!(result.contains_stderr("Would convert"));
    Ok(())
}

#[test]
fn test_missing_source_fails() -> Result<()> {
    let lib = TestLibrary::new();
    fs::remove_dir(lib.src())?;

    let result = lib.command(&[]).assert_failure()?;
    assert!(result.contains_stderr("Failed to mirror"));
    Ok(())
}
