//! Per-identity observation state.

use std::collections::HashMap;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::metrics::MetricId;

/// Last-known sample of one counter stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    /// Raw counter value at the last read
    pub last_value: u64,
    /// Monotonic time of the last read
    pub last_timestamp: Instant,
}

/// Owned map from metric identity to its last observation.
///
/// Entries are created at registration and overwritten on every sample;
/// they are never removed.
#[derive(Debug, Default)]
pub struct RateStore {
    entries: HashMap<MetricId, Observation>,
}

impl RateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last observation for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMetric`] if `id` was never set.
    pub fn get(&self, id: &MetricId) -> Result<Observation> {
        self.entries
            .get(id)
            .copied()
            .ok_or_else(|| Error::UnknownMetric(id.clone()))
    }

    /// Unconditionally overwrite the observation for `id`.
    pub fn set(&mut self, id: MetricId, value: u64, timestamp: Instant) {
        self.entries.insert(
            id,
            Observation {
                last_value: value,
                last_timestamp: timestamp,
            },
        );
    }

    /// Whether `id` has been registered.
    pub fn contains(&self, id: &MetricId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
