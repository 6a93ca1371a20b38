//! Common utilities for integration tests

#![allow(dead_code)]

pub mod cli;

use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Scratch source and destination trees
pub struct TestLibrary {
    temp: TempDir,
}

impl TestLibrary {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        fs::create_dir(temp.path().join("src")).expect("create source root");
        Self { temp }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn src(&self) -> PathBuf {
        self.root().join("src")
    }

    pub fn dst(&self) -> PathBuf {
        self.root().join("dst")
    }

    /// Add a source file, dated an hour ago so the mirror is never stale
    pub fn add(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.src().join(name);
        fs::create_dir_all(path.parent().expect("file has a parent")).expect("create dirs");
        fs::write(&path, contents).expect("write source file");
        let past = SystemTime::now() - Duration::from_secs(3600);
        filetime::set_file_mtime(&path, FileTime::from_system_time(past)).expect("set mtime");
        path
    }

    /// Relative names of every destination file, sorted
    pub fn dst_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        collect_files(&self.dst(), &self.dst(), &mut files);
        files.sort();
        files
    }

    /// `music-transcode --src <src> --dst <dst>` plus `args`
    pub fn command(&self, args: &[&str]) -> cli::TranscodeCommand {
        let mut cmd = cli::TranscodeCommand::new(self.root());
        cmd.path_arg("--src", &self.src())
            .path_arg("--dst", &self.dst())
            .args(args)
            .env("NO_COLOR", "1");
        cmd
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(relative) = path.strip_prefix(root) {
            out.push(relative.display().to_string());
        }
    }
}
