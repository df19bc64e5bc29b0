//! Acquisition module - Multi-source series loading
//!
//! Fetches the BTC daily series from the proxy, CoinGecko or the bundled
//! data, in that order of preference, and keeps it fresh in the background.

mod coordinator;
mod refresher;
pub mod sources;

pub use coordinator::FallbackCoordinator;
pub use refresher::{BackgroundRefresher, RefreshOutcome};
