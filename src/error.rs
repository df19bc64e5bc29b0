//! Error taxonomy for the acquisition pipeline
//!
//! None of these escape the fallback coordinator; callers of the loader only
//! ever see `GateError` (from waiting) or an empty series.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single source adapter
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("provider reported failure: {0}")]
    Rejected(String),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("only {got} points, need {need}")]
    InsufficientData { got: usize, need: usize },
}

impl FetchError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        FetchError::Malformed(msg.into())
    }
}

/// Persistence medium problems; always recovered by treating the cache as absent
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache record unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Returned to a caller awaiting the readiness gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("data not ready after {0:?}")]
    Timeout(Duration),
}

/// Rejected indicator data
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("indicator set has no dates")]
    Empty,

    #[error("indicator {name} has {got} values for {expected} dates")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("date axis is not in ascending order at index {0}")]
    Unsorted(usize),

    #[error("indicator {0} contains a non-finite value")]
    NonFinite(String),

    #[error("bad date {0:?} in indicator data")]
    BadDate(String),

    #[error("indicator data unreadable: {0}")]
    Decode(String),
}
