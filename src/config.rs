//! Command-line configuration for tapestat.
//!
//! This module defines all CLI arguments using `clap` for parsing.
//! The configuration controls the polling interval, the sysfs location,
//! the CSV log and the display mode.

use std::path::PathBuf;

use clap::Parser;

use crate::drives::SYSFS_TAPE_PATH;

/// Tape drive statistics monitor.
///
/// tapestat reads the cumulative counters the Linux `st` driver exposes
/// under `/sys/class/scsi_tape/nst*/stats/` and turns them into
/// per-second rates:
///
/// - read_cnt/s and write_cnt/s (requests per second)
/// - read_byte_cnt/s and write_byte_cnt/s (bytes per second)
///
/// # Examples
///
/// ```bash
/// # Run with TUI interface (default)
/// tapestat
///
/// # Run in headless mode with 10-second intervals
/// tapestat --headless -i 10
///
/// # Print the metric descriptors and exit
/// tapestat --describe
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Per-second rates from Linux tape drive counters")]
pub struct Config {
    /// Interval in seconds between samples.
    ///
    /// Rates are averaged over this interval, so longer intervals smooth
    /// out bursty drive activity.
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Path to CSV log file.
    ///
    /// Every computed rate is appended to this file in CSV format.
    /// The file is created if it doesn't exist, and new data is appended
    /// if it does (headers are only written once).
    #[arg(short = 'c', long, default_value = "tapestats.csv")]
    pub csv_file: String,

    /// Directory holding the tape class entries.
    ///
    /// Only useful for pointing tapestat at a copy of the sysfs tree.
    #[arg(long, default_value = SYSFS_TAPE_PATH)]
    pub sysfs: PathBuf,

    /// Number of samples to keep in memory per metric for plotting.
    ///
    /// At 5-second intervals, 120 points = 10 minutes of history.
    #[arg(long, default_value_t = 120)]
    pub history_size: usize,

    /// Run in headless mode (no TUI, just logging).
    #[arg(long)]
    pub headless: bool,

    /// Print the metric descriptors as CSV and exit.
    #[arg(long)]
    pub describe: bool,

    /// Trace every read and rate computation (debug log level).
    ///
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse_from(["tapestat"]);
        assert_eq!(config.interval, 5);
        assert_eq!(config.csv_file, "tapestats.csv");
        assert_eq!(config.sysfs, PathBuf::from("/sys/class/scsi_tape"));
        assert!(!config.headless && !config.describe && !config.verbose);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Config::try_parse_from(["tapestat", "-i", "0"]).is_err());
    }

    #[test]
    fn overrides() {
        let config = Config::parse_from([
            "tapestat",
            "--headless",
            "-i",
            "30",
            "--sysfs",
            "/tmp/tape",
            "-v",
        ]);
        assert!(config.headless && config.verbose);
        assert_eq!(config.interval, 30);
        assert_eq!(config.sysfs, PathBuf::from("/tmp/tape"));
    }
}
