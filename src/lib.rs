//! btcfeed Library
//!
//! Daily BTC price history with multi-source fallback, a freshness cache and
//! a readiness gate, plus macro indicators aligned to the BTC dates.

pub mod acquisition;
pub mod alignment;
pub mod cache;
pub mod config;
pub mod dates;
pub mod error;
pub mod gate;
pub mod loader;
pub mod state;
pub mod types;
pub mod yields;

pub use config::AppConfig;
pub use error::{CacheError, FetchError, GateError, IndicatorError};
pub use loader::PriceLoader;
pub use state::{DataStatus, LoadPhase};
pub use types::{DateRange, Series, SeriesPoint, SourceId};
