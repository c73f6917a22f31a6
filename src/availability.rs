//! Source availability tracking for tapestat.
//!
//! This module checks, at startup and before registration, whether the
//! sysfs tape class and the per-drive statistics directories exist. The
//! warnings are logged first, so a registration failure that follows is
//! explained. A class with no drives still starts, and the dashboard shows
//! the warning in place of the empty rate table.

use std::path::{Path, PathBuf};

use crate::drives;

/// Tracks which counter sources are available.
#[derive(Default, Clone, Debug)]
pub struct SourceAvailability {
    /// Base directory that was checked
    pub base: PathBuf,
    /// The tape class directory could be listed
    pub tape_class: bool,
    /// Drives matching `nst<digits>`
    pub drives: Vec<String>,
    /// Drives without a `stats/` directory (kernels before 4.2, or no `st` stats support)
    pub drives_without_stats: Vec<String>,
}

impl SourceAvailability {
    /// Check `base` and return availability status.
    pub fn check(base: &Path) -> Self {
        let mut availability = Self {
            base: base.to_path_buf(),
            ..Self::default()
        };

        let Ok(found) = drives::find_drives(base) else {
            return availability;
        };
        availability.tape_class = true;

        for drive in found {
            if !base.join(&drive).join("stats").is_dir() {
                availability.drives_without_stats.push(drive.clone());
            }
            availability.drives.push(drive);
        }

        availability
    }

    /// Generate warnings for unavailable sources.
    pub fn get_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.tape_class {
            warnings.push(format!(
                "{} not found (is the st driver loaded?)",
                self.base.display()
            ));
        } else if self.drives.is_empty() {
            warnings.push(format!("No nst* tape drives in {}", self.base.display()));
        }
        if !self.drives_without_stats.is_empty() {
            warnings.push(format!(
                "No stats directory for {} (requires Linux 4.2+)",
                self.drives_without_stats.join(", ")
            ));
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::tempdir;

    #[test]
    fn missing_class_directory() {
        let dir = tempdir().unwrap();
        let availability = SourceAvailability::check(&dir.path().join("scsi_tape"));

        assert!(!availability.tape_class);
        let warnings = availability.get_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("st driver"));
    }

    #[test]
    fn no_drives() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("st0")).unwrap();

        let availability = SourceAvailability::check(dir.path());
        assert!(availability.tape_class);
        assert!(availability.drives.is_empty());
        assert!(availability.get_warnings()[0].starts_with("No nst* tape drives"));
    }

    #[test]
    fn drive_without_stats() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nst0/stats")).unwrap();
        fs::create_dir(dir.path().join("nst1")).unwrap();

        let availability = SourceAvailability::check(dir.path());
        assert_eq!(availability.drives.len(), 2);
        assert_eq!(availability.drives_without_stats, vec!["nst1".to_string()]);
        assert_eq!(availability.get_warnings().len(), 1);
    }

    #[test]
    fn healthy_tree_has_no_warnings() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nst0/stats")).unwrap();

        assert!(SourceAvailability::check(dir.path()).get_warnings().is_empty());
    }
}
