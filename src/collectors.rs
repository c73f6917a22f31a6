//! Raw counter collection for tapestat.
//!
//! This module reads cumulative tape counters from sysfs. Each counter is a
//! single file holding one decimal integer.
//!
//! # Data Sources
//!
//! - `/sys/class/scsi_tape/<drive>/stats/read_cnt` - Read requests issued
//! - `/sys/class/scsi_tape/<drive>/stats/write_cnt` - Write requests issued
//! - `/sys/class/scsi_tape/<drive>/stats/read_byte_cnt` - Bytes read
//! - `/sys/class/scsi_tape/<drive>/stats/write_byte_cnt` - Bytes written

use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::metrics::{MetricId, TapeMetric};

/// Anything that can produce the current raw value of a tracked counter.
pub trait CounterSource {
    /// Read the current cumulative value for `id`.
    fn read(&self, id: &MetricId) -> Result<u64>;
}

/// Reads counters from a sysfs tape class directory.
#[derive(Clone, Debug)]
pub struct SysfsCounters {
    base: PathBuf,
}

impl SysfsCounters {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl CounterSource for SysfsCounters {
    fn read(&self, id: &MetricId) -> Result<u64> {
        read_counter(&self.base, &id.drive, id.metric)
    }
}

/// Path of one counter file: `<base>/<drive>/stats/<metric>`.
pub fn counter_path(base: &Path, drive: &str, metric: TapeMetric) -> PathBuf {
    base.join(drive).join("stats").join(metric.as_str())
}

/// Read one counter for `drive` from `<base>/<drive>/stats/<metric>`.
///
/// Surrounding whitespace (the kernel appends a newline) is ignored.
///
/// # Errors
///
/// - [`Error::SourceUnavailable`] if the file cannot be opened or read
/// - [`Error::MalformedValue`] if the content is not a non-negative integer
pub fn read_counter(base: &Path, drive: &str, metric: TapeMetric) -> Result<u64> {
    let path = counter_path(base, drive, metric);
    debug!("Opening sysfs file {}", path.display());

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(source) => return Err(Error::SourceUnavailable { path, source }),
    };

    let value = match content.trim().parse::<u64>() {
        Ok(value) => value,
        Err(_) => {
            return Err(Error::MalformedValue {
                path,
                content: content.trim().to_string(),
            })
        }
    };

    debug!("Got metric value {} for metric {} of {}", value, metric, drive);
    Ok(value)
}
