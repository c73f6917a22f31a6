//! Tape drive discovery.
//!
//! Drives are the entries of the `scsi_tape` sysfs class whose names match
//! `nst<digits>` (the non-rewinding device nodes). Discovery is lazy: the
//! directory is opened up front, but entries are filtered as the caller
//! iterates.

use std::fs::ReadDir;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::error::{Error, Result};

/// Default location of the tape class in sysfs.
pub const SYSFS_TAPE_PATH: &str = "/sys/class/scsi_tape";

const DRIVE_PATTERN: &str = r"^nst[0-9]+$";

fn drive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(DRIVE_PATTERN).expect("drive pattern is a valid regex"))
}

/// Returns true if `name` is a tape drive identifier we track.
pub fn is_drive_name(name: &str) -> bool {
    drive_pattern().is_match(name)
}

/// Lazy sequence of drive identifiers found under a base directory.
///
/// Yields names in filesystem listing order, which is unspecified.
#[derive(Debug)]
pub struct Drives {
    base: PathBuf,
    entries: ReadDir,
}

impl Iterator for Drives {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("Skipping unreadable entry in {}: {}", self.base.display(), err);
                    continue;
                }
            };

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            if is_drive_name(name) {
                debug!("Found drive {}", name);
                return Some(name.to_string());
            }
        }

        None
    }
}

/// List the tape drives under `base`.
///
/// # Errors
///
/// Returns [`Error::Enumeration`] if `base` cannot be listed. A directory
/// without any matching entry is not an error.
pub fn find_drives(base: &Path) -> Result<Drives> {
    let entries = std::fs::read_dir(base).map_err(|source| Error::Enumeration {
        path: base.to_path_buf(),
        source,
    })?;

    Ok(Drives {
        base: base.to_path_buf(),
        entries,
    })
}
