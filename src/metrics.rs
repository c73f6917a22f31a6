//! Metric identities, descriptors and rate samples.
//!
//! This module defines what is being tracked ([`TapeMetric`], [`MetricId`]),
//! what the monitoring agent is told about each tracked counter
//! ([`MetricDescriptor`]), and the per-tick record written to the CSV log
//! ([`RateSample`]).

use std::fmt;
use std::io::Write;

use serde::Serialize;

/// Prefix shared by every exported metric name.
pub const METRIC_PREFIX: &str = "tapestat";

/// Sampling ceiling advertised to the agent, in seconds.
pub const TIME_MAX_SECS: u32 = 60;

/// Grouping tag advertised to the agent.
pub const METRIC_GROUP: &str = "tapestats";

/// Counters exposed under `/sys/class/scsi_tape/<drive>/stats/`.
///
/// See the kernel's `Documentation/scsi/st.rst` for their meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TapeMetric {
    /// Number of read requests issued to the drive
    ReadCnt,
    /// Number of write requests issued to the drive
    WriteCnt,
    /// Bytes read from the drive
    ReadByteCnt,
    /// Bytes written to the drive
    WriteByteCnt,
}

impl TapeMetric {
    /// All metrics, in registration order.
    pub const ALL: [TapeMetric; 4] = [
        TapeMetric::ReadCnt,
        TapeMetric::WriteCnt,
        TapeMetric::ReadByteCnt,
        TapeMetric::WriteByteCnt,
    ];

    /// The sysfs file name of this counter.
    pub fn as_str(self) -> &'static str {
        match self {
            TapeMetric::ReadCnt => "read_cnt",
            TapeMetric::WriteCnt => "write_cnt",
            TapeMetric::ReadByteCnt => "read_byte_cnt",
            TapeMetric::WriteByteCnt => "write_byte_cnt",
        }
    }
}

impl fmt::Display for TapeMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked counter stream: a drive and one of its counters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MetricId {
    pub drive: String,
    pub metric: TapeMetric,
}

impl MetricId {
    pub fn new(drive: impl Into<String>, metric: TapeMetric) -> Self {
        Self {
            drive: drive.into(),
            metric,
        }
    }

    /// Exported name, e.g. `tapestat_nst0_write_cnt`.
    pub fn name(&self) -> String {
        format!("{}_{}_{}", METRIC_PREFIX, self.drive, self.metric)
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.drive, self.metric)
    }
}

/// Registration record consumed by the monitoring agent.
///
/// Field names and values are part of the agent's descriptor schema and
/// must not change.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MetricDescriptor {
    pub name: String,
    pub time_max: u32,
    pub value_type: &'static str,
    pub units: String,
    pub slope: &'static str,
    pub format: &'static str,
    pub description: String,
    pub groups: &'static str,
}

impl MetricDescriptor {
    pub fn for_id(id: &MetricId) -> Self {
        Self {
            name: id.name(),
            time_max: TIME_MAX_SECS,
            value_type: "float",
            units: format!("{}/s", id.metric),
            slope: "both",
            format: "%f",
            description: id.metric.as_str().to_string(),
            groups: METRIC_GROUP,
        }
    }
}

/// Write `descriptors` as CSV, header first, one row per descriptor.
pub fn write_descriptors<W: Write>(
    writer: W,
    descriptors: &[MetricDescriptor],
) -> std::io::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for descriptor in descriptors {
        writer.serialize(descriptor).map_err(std::io::Error::other)?;
    }
    writer.flush()
}

/// One computed (or failed) rate, as logged to CSV.
#[derive(Serialize, Clone, Debug, Default)]
pub struct RateSample {
    /// Unix timestamp (seconds since epoch)
    pub timestamp: i64,
    /// ISO 8601 formatted datetime string
    pub datetime: String,
    /// Exported metric name
    pub name: String,
    pub drive: String,
    pub metric: String,
    /// Raw counter value read this tick (None if the read failed)
    pub value: Option<u64>,
    /// Units per second (None if the read or the computation failed)
    pub rate: Option<f64>,
    /// Failure description, if any
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_matches_agent_schema() {
        let id = MetricId::new("nst3", TapeMetric::WriteByteCnt);
        let desc = MetricDescriptor::for_id(&id);

        assert_eq!(desc.name, "tapestat_nst3_write_byte_cnt");
        assert_eq!(desc.time_max, 60);
        assert_eq!(desc.value_type, "float");
        assert_eq!(desc.units, "write_byte_cnt/s");
        assert_eq!(desc.slope, "both");
        assert_eq!(desc.format, "%f");
        assert_eq!(desc.description, "write_byte_cnt");
        assert_eq!(desc.groups, "tapestats");
    }

    #[test]
    fn descriptors_as_csv() {
        let descriptors = [MetricDescriptor::for_id(&MetricId::new(
            "nst0",
            TapeMetric::WriteCnt,
        ))];
        let mut out = Vec::new();
        write_descriptors(&mut out, &descriptors).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "name,time_max,value_type,units,slope,format,description,groups",
                "tapestat_nst0_write_cnt,60,float,write_cnt/s,both,%f,write_cnt,tapestats",
            ]
        );
    }

    #[test]
    fn metric_order_is_fixed() {
        let names: Vec<_> = TapeMetric::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(
            names,
            ["read_cnt", "write_cnt", "read_byte_cnt", "write_byte_cnt"]
        );
    }
}
