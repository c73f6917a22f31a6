//! Metric registration and per-identity rate callbacks.
//!
//! Registration walks the metric × drive cross product, takes one baseline
//! reading per pair and hands back a [`Registration`] for each: the
//! descriptor the monitoring agent needs, bound to the identity that
//! [`TapeStats::update`] is later called with.

use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};

use crate::collectors::{CounterSource, SysfsCounters};
use crate::drives;
use crate::error::{Error, Result};
use crate::metrics::{MetricDescriptor, MetricId, TapeMetric};
use crate::rate::RateCalculator;

/// A registered counter stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Registration {
    pub id: MetricId,
    pub descriptor: MetricDescriptor,
}

/// Register every (metric, drive) pair and seed its baseline.
///
/// Metrics form the outer loop and drives the inner one, so the result is
/// grouped by metric. Registration is all-or-nothing: if any baseline read
/// fails the error is returned and `calculator` is left untouched.
pub fn register_all<S, D>(
    metrics: &[TapeMetric],
    drives: &[D],
    source: &S,
    calculator: &mut RateCalculator,
    now: Instant,
) -> Result<Vec<Registration>>
where
    S: CounterSource + ?Sized,
    D: AsRef<str>,
{
    let mut staged = Vec::with_capacity(metrics.len() * drives.len());

    for metric in metrics {
        for drive in drives {
            let id = MetricId::new(drive.as_ref(), *metric);
            debug!("Process metric {} for tape drive {}", metric, drive.as_ref());

            let value = source.read(&id)?;
            debug!("Metric name -> {}", id.name());
            staged.push((id, value));
        }
    }

    let registrations = staged
        .into_iter()
        .map(|(id, value)| {
            calculator.seed(id.clone(), value, now);
            Registration {
                descriptor: MetricDescriptor::for_id(&id),
                id,
            }
        })
        .collect();

    Ok(registrations)
}

/// Outcome of one identity during a collection tick.
#[derive(Debug)]
pub struct Reading {
    pub id: MetricId,
    /// Raw counter value, if the sample succeeded
    pub value: Option<u64>,
    /// Rate since the previous successful sample
    pub rate: Result<f64>,
}

/// Registered tape counters together with their rate state.
pub struct TapeStats<S> {
    source: S,
    calculator: RateCalculator,
    registrations: Vec<Registration>,
}

impl TapeStats<SysfsCounters> {
    /// Discover every drive under `base` and register all metrics for it.
    pub fn discover(base: &Path) -> Result<Self> {
        let found: Vec<String> = drives::find_drives(base)?.collect();
        info!("Found {} tape drive(s) in {}", found.len(), base.display());

        let stats = Self::new(SysfsCounters::new(base), &found, Instant::now())?;
        if stats.calculator.store().is_empty() {
            warn!("No tape metrics registered from {}", base.display());
        } else {
            info!("Registered {} tape metrics", stats.calculator.store().len());
        }
        Ok(stats)
    }
}

impl<S: CounterSource> TapeStats<S> {
    /// Register all metrics for `drives` against `source`, seeding at `now`.
    pub fn new<D: AsRef<str>>(source: S, drives: &[D], now: Instant) -> Result<Self> {
        let mut calculator = RateCalculator::new();
        let registrations =
            register_all(&TapeMetric::ALL, drives, &source, &mut calculator, now)?;

        Ok(Self {
            source,
            calculator,
            registrations,
        })
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// The descriptor bundle for the monitoring agent.
    pub fn descriptors(&self) -> Vec<MetricDescriptor> {
        self.registrations
            .iter()
            .map(|r| r.descriptor.clone())
            .collect()
    }

    /// Rate callback for one identity: read the counter and compute its rate.
    ///
    /// A failed read leaves the stored observation untouched. An identity
    /// that was never registered is rejected without touching the source.
    pub fn update(&mut self, id: &MetricId, now: Instant) -> Result<f64> {
        if !self.calculator.store().contains(id) {
            return Err(Error::UnknownMetric(id.clone()));
        }
        let value = self.source.read(id)?;
        self.calculator.compute_rate(id, value, now)
    }

    /// Sample every registration once, sharing a single clock reading.
    ///
    /// Each identity fails independently; an error for one does not stop
    /// the others.
    pub fn collect(&mut self, now: Instant) -> Vec<Reading> {
        let ids: Vec<MetricId> = self.registrations.iter().map(|r| r.id.clone()).collect();

        ids.into_iter()
            .map(|id| {
                let rate = self.update(&id, now);
                // On success the store holds exactly the value just read
                let value = match rate {
                    Ok(_) => self.calculator.store().get(&id).ok().map(|o| o.last_value),
                    Err(_) => None,
                };
                Reading { id, value, rate }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    /// In-memory counters; a missing entry behaves like a missing sysfs file.
    #[derive(Default)]
    struct ScriptedCounters {
        values: RefCell<HashMap<MetricId, u64>>,
    }

    impl ScriptedCounters {
        fn set(&self, drive: &str, metric: TapeMetric, value: u64) {
            self.values
                .borrow_mut()
                .insert(MetricId::new(drive, metric), value);
        }

        fn remove(&self, drive: &str, metric: TapeMetric) {
            self.values
                .borrow_mut()
                .remove(&MetricId::new(drive, metric));
        }

        fn all(drives: &[&str], value: u64) -> Self {
            let counters = Self::default();
            for drive in drives {
                for metric in TapeMetric::ALL {
                    counters.set(drive, metric, value);
                }
            }
            counters
        }
    }

    impl CounterSource for ScriptedCounters {
        fn read(&self, id: &MetricId) -> Result<u64> {
            self.values
                .borrow()
                .get(id)
                .copied()
                .ok_or_else(|| Error::SourceUnavailable {
                    path: PathBuf::from(format!("{}/stats/{}", id.drive, id.metric)),
                    source: std::io::ErrorKind::NotFound.into(),
                })
        }
    }

    #[test]
    fn registers_metric_major_order() {
        let source = ScriptedCounters::all(&["nst0", "nst1"], 1);
        let mut calc = RateCalculator::new();

        let regs = register_all(
            &TapeMetric::ALL,
            &["nst0", "nst1"],
            &source,
            &mut calc,
            Instant::now(),
        )
        .unwrap();

        let names: Vec<_> = regs.iter().map(|r| r.descriptor.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "tapestat_nst0_read_cnt",
                "tapestat_nst1_read_cnt",
                "tapestat_nst0_write_cnt",
                "tapestat_nst1_write_cnt",
                "tapestat_nst0_read_byte_cnt",
                "tapestat_nst1_read_byte_cnt",
                "tapestat_nst0_write_byte_cnt",
                "tapestat_nst1_write_byte_cnt",
            ]
        );
        assert_eq!(calc.store().len(), 8);
    }

    #[test]
    fn seeds_baseline_from_initial_read() {
        let source = ScriptedCounters::default();
        source.set("nst0", TapeMetric::WriteCnt, 1000);
        let mut calc = RateCalculator::new();
        let t0 = Instant::now();

        let regs =
            register_all(&[TapeMetric::WriteCnt], &["nst0"], &source, &mut calc, t0).unwrap();
        assert_eq!(regs.len(), 1);

        let obs = calc.store().get(&regs[0].id).unwrap();
        assert_eq!(obs.last_value, 1000);
        assert_eq!(obs.last_timestamp, t0);
    }

    #[test]
    fn failing_read_aborts_whole_registration() {
        let source = ScriptedCounters::all(&["nst0", "nst1"], 5);
        source.remove("nst1", TapeMetric::ReadByteCnt);
        let mut calc = RateCalculator::new();

        let err = register_all(
            &TapeMetric::ALL,
            &["nst0", "nst1"],
            &source,
            &mut calc,
            Instant::now(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::SourceUnavailable { .. }));
        assert!(calc.store().is_empty());
    }

    #[test]
    fn no_drives_registers_nothing() {
        let source = ScriptedCounters::default();
        let stats = TapeStats::new(source, &[] as &[&str], Instant::now()).unwrap();
        assert!(stats.registrations().is_empty());
        assert!(stats.descriptors().is_empty());
    }

    #[test]
    fn first_update_measures_from_registration() {
        let source = ScriptedCounters::all(&["nst0"], 1000);
        let t0 = Instant::now();
        let mut stats = TapeStats::new(source, &["nst0"], t0).unwrap();

        let id = MetricId::new("nst0", TapeMetric::WriteCnt);
        stats.source.set("nst0", TapeMetric::WriteCnt, 1500);

        let rate = stats.update(&id, t0 + Duration::from_secs(10)).unwrap();
        assert_eq!(rate, 50.0);
    }

    #[test]
    fn update_rejects_unregistered_identity() {
        let source = ScriptedCounters::all(&["nst0"], 1);
        let t0 = Instant::now();
        let mut stats = TapeStats::new(source, &["nst0"], t0).unwrap();

        // nst1 has no counters either; the registration check comes first
        let id = MetricId::new("nst1", TapeMetric::ReadCnt);
        let err = stats.update(&id, t0 + Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::UnknownMetric(ref m) if m == &id));
    }

    #[test]
    fn collect_isolates_failures() {
        let source = ScriptedCounters::all(&["nst0", "nst1"], 100);
        let t0 = Instant::now();
        let mut stats = TapeStats::new(source, &["nst0", "nst1"], t0).unwrap();

        for metric in TapeMetric::ALL {
            stats.source.set("nst0", metric, 300);
        }
        stats.source.remove("nst1", TapeMetric::ReadCnt);

        let t2 = t0 + Duration::from_secs(2);
        let readings = stats.collect(t2);
        assert_eq!(readings.len(), 8);

        for reading in &readings {
            if reading.id == MetricId::new("nst1", TapeMetric::ReadCnt) {
                assert!(reading.value.is_none());
                assert!(matches!(reading.rate, Err(Error::SourceUnavailable { .. })));
            } else if reading.id.drive == "nst0" {
                assert_eq!(reading.value, Some(300));
                assert_eq!(*reading.rate.as_ref().unwrap(), 100.0);
            } else {
                assert_eq!(*reading.rate.as_ref().unwrap(), 0.0);
            }
        }

        // The failed identity keeps its registration baseline
        let failed = MetricId::new("nst1", TapeMetric::ReadCnt);
        let obs = stats.calculator.store().get(&failed).unwrap();
        assert_eq!(obs.last_value, 100);
        assert_eq!(obs.last_timestamp, t0);
    }

    #[test]
    fn discover_from_sysfs_tree() {
        let dir = tempfile::tempdir().unwrap();
        for drive in ["nst0", "st0"] {
            let stats = dir.path().join(drive).join("stats");
            std::fs::create_dir_all(&stats).unwrap();
            for metric in TapeMetric::ALL {
                std::fs::write(stats.join(metric.as_str()), "12\n").unwrap();
            }
        }

        let stats = TapeStats::discover(dir.path()).unwrap();
        let descriptors = stats.descriptors();
        assert_eq!(descriptors.len(), 4);
        assert!(descriptors.iter().all(|d| d.name.starts_with("tapestat_nst0_")));
    }
}
