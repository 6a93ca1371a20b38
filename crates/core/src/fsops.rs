//! Write-then-rename helpers and timestamp rounding

use crate::error::{IoContext, Result};
use filetime::FileTime;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Temporary sibling used while `target` is being written
pub fn temp_path(target: &Path) -> PathBuf {
    let mut name: OsString = target.as_os_str().to_os_string();
    name.push("~");
    PathBuf::from(name)
}

/// Copy file contents (not mode, owner or times) into `temp`
pub fn copy_contents(source: &Path, temp: &Path) -> Result<()> {
    let mut reader = File::open(source).at(source)?;
    let mut writer = File::create(temp).at(temp)?;
    io::copy(&mut reader, &mut writer).at(temp)?;
    writer.sync_all().at(temp)?;
    Ok(())
}

/// Move a finished temporary file to its final name
pub fn commit(temp: &Path, target: &Path) -> Result<()> {
    fs::rename(temp, target).at(target)
}

/// Run `write` against the temporary sibling of `target`, then rename it into place
///
/// The temporary file is removed if `write` fails, so `target` either
/// keeps its previous state or receives the complete new contents.
pub fn write_atomic<F>(target: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let temp = temp_path(target);
    match write(&temp).and_then(|()| commit(&temp, target)) {
        Ok(()) => Ok(()),
        Err(err) => {
            let _ = fs::remove_file(&temp);
            Err(err)
        }
    }
}

/// Smallest even whole second at or after `time`, `None` if `time` already is one
pub fn round_up_to_even_second(time: FileTime) -> Option<FileTime> {
    let secs = time.unix_seconds();
    if time.nanoseconds() == 0 && secs.rem_euclid(2) == 0 {
        return None;
    }

    let mut rounded = if time.nanoseconds() > 0 { secs + 1 } else { secs };
    if rounded.rem_euclid(2) == 1 {
        rounded += 1;
    }
    Some(FileTime::from_unix_time(rounded, 0))
}

/// Round the modification time of `path` up to an even second
///
/// Filesystems with two-second resolution would otherwise truncate it
/// below the source time. Returns whether the time changed.
pub fn flatten_mtime(path: &Path) -> Result<bool> {
    let meta = fs::symlink_metadata(path).at(path)?;
    let mtime = FileTime::from_last_modification_time(&meta);
    match round_up_to_even_second(mtime) {
        Some(rounded) => {
            filetime::set_file_mtime(path, rounded).at(path)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
