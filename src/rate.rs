//! Conversion of cumulative counters into per-second rates.
//!
//! [`RateCalculator`] owns the [`RateStore`] and is the only thing that
//! mutates it after registration. Each call to
//! [`RateCalculator::compute_rate`] consumes the previous observation of one
//! identity and replaces it with the new one.
//!
//! # Counter resets
//!
//! The kernel counters restart from zero when a drive is re-attached or the
//! `st` driver is reloaded, and they may wrap on overflow. Neither case is
//! special-cased: the delta is reported as-is, so the resulting rate is
//! negative. Consumers that care about resets should watch for negative
//! rates.

use std::time::Instant;

use log::debug;

use crate::error::{Error, Result};
use crate::metrics::MetricId;
use crate::state::{Observation, RateStore};

/// Stateful rate calculator over an owned [`RateStore`].
#[derive(Debug, Default)]
pub struct RateCalculator {
    store: RateStore,
}

impl RateCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a baseline observation for `id`.
    pub fn seed(&mut self, id: MetricId, value: u64, timestamp: Instant) {
        debug!("Set {} baseline to {}", id, value);
        self.store.set(id, value, timestamp);
    }

    pub fn store(&self) -> &RateStore {
        &self.store
    }

    /// Compute the rate of `id` since its last observation, in units/second.
    ///
    /// On success the stored observation becomes `(current_value,
    /// current_timestamp)`. On failure the stored observation is unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownMetric`] if `id` has no observation
    /// - [`Error::NonPositiveInterval`] if `current_timestamp` is not strictly
    ///   after the stored timestamp
    pub fn compute_rate(
        &mut self,
        id: &MetricId,
        current_value: u64,
        current_timestamp: Instant,
    ) -> Result<f64> {
        let previous = self.store.get(id)?;
        let rate = rate_between(id, &previous, current_value, current_timestamp)?;

        self.store.set(id.clone(), current_value, current_timestamp);
        Ok(rate)
    }
}

fn rate_between(
    id: &MetricId,
    previous: &Observation,
    current_value: u64,
    current_timestamp: Instant,
) -> Result<f64> {
    let elapsed = current_timestamp
        .checked_duration_since(previous.last_timestamp)
        .filter(|elapsed| !elapsed.is_zero())
        .ok_or_else(|| Error::NonPositiveInterval(id.clone()))?;

    if current_value == previous.last_value {
        debug!("No calc required for {}, returning a delta of 0", id);
        return Ok(0.0);
    }

    // i128 keeps the full u64 range and the sign of a reset
    let delta = i128::from(current_value) - i128::from(previous.last_value);
    let seconds = elapsed.as_secs_f64();
    let rate = delta as f64 / seconds;

    debug!(
        "Performing calculation ({} - {}) / {:.6} for {}",
        current_value, previous.last_value, seconds, id
    );
    debug!("Returning a delta of {} for {}", rate, id);

    Ok(rate)
}
