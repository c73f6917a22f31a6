//! # tapestat
//!
//! Per-second rates from Linux tape drive statistics.
//!
//! ## Overview
//!
//! The Linux `st` driver keeps cumulative counters for every tape drive
//! under `/sys/class/scsi_tape/<drive>/stats/`. `tapestat` samples them on a
//! fixed cadence and reports how fast they grow:
//!
//! - `read_cnt` / `write_cnt`: read and write requests per second
//! - `read_byte_cnt` / `write_byte_cnt`: bytes read and written per second
//!
//! Each (drive, counter) pair keeps its own last value and timestamp, so the
//! rate of one metric never depends on when another was sampled.
//!
//! ## Usage
//!
//! ```bash
//! # Run with TUI (default)
//! tapestat
//!
//! # Headless mode for logging only
//! tapestat --headless
//!
//! # Trace every read and calculation
//! tapestat --headless -v
//! ```
//!
//! ## Module Organization
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`drives`]: Tape drive discovery
//! - [`collectors`]: Raw counter reads from sysfs
//! - [`state`]: Per-metric observation store
//! - [`rate`]: Rate computation
//! - [`registry`]: Metric registration and descriptors
//! - [`app`]: Main application state and coordination
//! - [`ui`]: Terminal user interface

mod app;
mod availability;
mod collectors;
mod config;
mod drives;
mod error;
mod metrics;
mod rate;
mod registry;
mod state;
mod ui;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;

use app::App;
use availability::SourceAvailability;
use config::Config;
use registry::TapeStats;

fn main() -> std::io::Result<()> {
    let config = Config::parse();
    init_logging(config.verbose);

    #[cfg(not(target_os = "linux"))]
    log::warn!("tapestat reads /sys/class/scsi_tape, which only exists on Linux");

    if config.describe {
        return describe(&config);
    }

    // Report missing sources first; registration below aborts on them
    let availability = SourceAvailability::check(&config.sysfs);
    for warning in availability.get_warnings() {
        log::warn!("{}", warning);
    }

    let app = App::new(config.clone(), availability)?;

    // Setup Ctrl+C / SIGTERM handler
    let running = Arc::new(AtomicBool::new(true));
    setup_signal_handler(running.clone());

    let interval = Duration::from_secs(config.interval);

    // Check if stdout is a TTY - if not, force headless mode
    let use_headless = config.headless || !is_terminal();
    if !config.headless && !is_terminal() {
        log::warn!("stdout is not a TTY, running in headless mode");
    }

    if use_headless {
        ui::run_headless(app, running, interval)?;
    } else {
        ui::run(app, running, interval)?;
    }

    Ok(())
}

/// Initialize `env_logger`; `RUST_LOG` overrides the flag-derived level.
fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

/// Print the descriptor bundle as CSV on stdout.
fn describe(config: &Config) -> std::io::Result<()> {
    let stats = TapeStats::discover(&config.sysfs)?;
    metrics::write_descriptors(std::io::stdout(), &stats.descriptors())
}

/// Global flag for signal handler (must be static for signal safety).
static SIGNAL_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Set up signal handlers for graceful shutdown.
fn setup_signal_handler(running: Arc<AtomicBool>) {
    // Spawn a thread to monitor the signal flag and propagate to running
    let running_clone = running.clone();
    std::thread::spawn(move || {
        while running_clone.load(Ordering::Relaxed) {
            if SIGNAL_RECEIVED.load(Ordering::Relaxed) {
                running_clone.store(false, Ordering::Relaxed);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
    });

    unsafe {
        libc::signal(
            libc::SIGINT,
            signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGTERM,
            signal_handler as *const () as libc::sighandler_t,
        );
    }
}

/// Signal handler that sets the signal flag (async-signal-safe).
extern "C" fn signal_handler(_: i32) {
    SIGNAL_RECEIVED.store(true, Ordering::Relaxed);
}

/// Check if stdout is connected to a terminal.
fn is_terminal() -> bool {
    unsafe { libc::isatty(libc::STDOUT_FILENO) != 0 }
}
