//! Error types for tapestat.
//!
//! Every failure in the collection core maps onto one variant of [`Error`].
//! Nothing in the core retries or swallows an error; they all propagate to
//! whoever drove the operation (registration at startup, or a tick).

use std::path::PathBuf;

use thiserror::Error;

use crate::metrics::MetricId;

/// Errors produced while discovering drives, reading counters or computing rates.
#[derive(Error, Debug)]
pub enum Error {
    /// The tape class directory could not be listed
    #[error("cannot list tape drives in {}: {source}", .path.display())]
    Enumeration {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A counter file is missing or unreadable
    #[error("counter source {} unavailable: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A counter file did not hold a non-negative decimal integer
    #[error("malformed counter value {content:?} in {}", .path.display())]
    MalformedValue { path: PathBuf, content: String },

    /// A rate was requested for an identity that was never registered
    #[error("metric {0} is not registered")]
    UnknownMetric(MetricId),

    /// The clock did not advance between two samples of the same identity
    #[error("non-positive sampling interval for metric {0}")]
    NonPositiveInterval(MetricId),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        // Keep the io kind so callers can still tell NotFound from PermissionDenied
        let kind = match &err {
            Error::Enumeration { source, .. } | Error::SourceUnavailable { source, .. } => {
                source.kind()
            }
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}
