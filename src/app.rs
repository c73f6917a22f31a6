//! Application state and logic for tapestat.
//!
//! This module contains the main [`App`] struct which coordinates
//! counter collection, CSV logging, and the user interface.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use log::warn;

use crate::availability::SourceAvailability;
use crate::collectors::SysfsCounters;
use crate::config::Config;
use crate::metrics::RateSample;
use crate::registry::TapeStats;

/// All samples taken in one collection pass.
#[derive(Clone, Debug, Default)]
pub struct Tick {
    /// ISO 8601 formatted datetime of the pass
    pub datetime: String,
    /// One sample per registration, in registration order
    pub samples: Vec<RateSample>,
}

impl Tick {
    /// Number of samples that failed this tick.
    pub fn failures(&self) -> usize {
        self.samples.iter().filter(|s| s.error.is_some()).count()
    }
}

/// Main application state.
///
/// Holds configuration, registered tape counters, recent ticks for
/// plotting, and the CSV log.
pub struct App {
    /// Application configuration from CLI
    pub config: Config,

    /// Registered counters and their rate state
    pub stats: TapeStats<SysfsCounters>,

    /// Recent ticks for plotting
    pub history: VecDeque<Tick>,

    /// Source availability found at startup
    pub availability: SourceAvailability,

    /// CSV writer for logging
    csv_writer: csv::Writer<File>,
}

impl App {
    /// Create a new application instance.
    ///
    /// Discovers drives, registers every metric (taking the baseline
    /// readings), and opens the CSV log. `availability` is the startup check result
    /// the caller already reported, kept for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if registration fails for any drive or metric, or
    /// if the CSV file cannot be opened.
    pub fn new(config: Config, availability: SourceAvailability) -> std::io::Result<Self> {
        let stats = TapeStats::discover(&config.sysfs)?;

        // Initialize CSV writer (append mode, write header if new file)
        let csv_exists = Path::new(&config.csv_file).exists();
        let csv_file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&config.csv_file)?;

        let csv_writer = csv::WriterBuilder::new()
            .has_headers(!csv_exists)
            .from_writer(csv_file);

        let history_size = config.history_size;

        Ok(Self {
            config,
            stats,
            history: VecDeque::with_capacity(history_size),
            availability,
            csv_writer,
        })
    }

    /// Sample every registered counter once.
    ///
    /// All identities share one clock reading. Per-identity failures are
    /// logged and recorded in the returned tick; they never abort the pass.
    pub fn collect_tick(&mut self) -> std::io::Result<Tick> {
        let now = Instant::now();
        let wall = Utc::now();
        let timestamp = wall.timestamp();
        let datetime = wall.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();

        let samples = self
            .stats
            .collect(now)
            .into_iter()
            .map(|reading| {
                let (rate, error) = match reading.rate {
                    Ok(rate) => (Some(rate), None),
                    Err(err) => {
                        warn!("Failed to sample {}: {}", reading.id.name(), err);
                        (None, Some(err.to_string()))
                    }
                };

                RateSample {
                    timestamp,
                    datetime: datetime.clone(),
                    name: reading.id.name(),
                    drive: reading.id.drive.clone(),
                    metric: reading.id.metric.to_string(),
                    value: reading.value,
                    rate,
                    error,
                }
            })
            .collect();

        let tick = Tick { datetime, samples };
        self.log_tick(&tick)?;
        add_tick(&mut self.history, tick.clone(), self.config.history_size);

        Ok(tick)
    }

    /// Log samples to CSV file.
    fn log_tick(&mut self, tick: &Tick) -> std::io::Result<()> {
        for sample in &tick.samples {
            self.csv_writer
                .serialize(sample)
                .map_err(std::io::Error::other)?;
        }
        self.csv_writer.flush()
    }
}

/// Add a tick to history, maintaining max size.
pub fn add_tick(history: &mut VecDeque<Tick>, tick: Tick, max_size: usize) {
    if history.len() >= max_size {
        history.pop_front();
    }
    history.push_back(tick);
}
