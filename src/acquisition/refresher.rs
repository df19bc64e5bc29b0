//! Background Refresher - keeps cached data from going stale
//!
//! Runs after the loader served a cache hit. It re-runs the network part of
//! the fallback chain on a spawned task and only touches shared state when a
//! fresh adequate series arrives.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::acquisition::FallbackCoordinator;
use crate::cache::FreshnessCache;
use crate::state::LoadState;

/// What a finished refresh did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A fresh series replaced the served one
    Updated,
    /// Every network source failed; the served series was kept
    Kept,
}

/// Clears the in-flight flag when the refresh task ends, even by panic
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct BackgroundRefresher {
    coordinator: Arc<FallbackCoordinator>,
    cache: Arc<FreshnessCache>,
    state: Arc<LoadState>,
    in_flight: Arc<AtomicBool>,
    started: Arc<AtomicUsize>,
}

impl BackgroundRefresher {
    pub fn new(
        coordinator: Arc<FallbackCoordinator>,
        cache: Arc<FreshnessCache>,
        state: Arc<LoadState>,
    ) -> Self {
        Self {
            coordinator,
            cache,
            state,
            in_flight: Arc::new(AtomicBool::new(false)),
            started: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of refreshes started so far
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Fire-and-forget refresh.
    ///
    /// Returns `None` when a refresh is already in flight; at most one runs
    /// at a time so cache writes never interleave.
    pub fn refresh_async(&self) -> Option<JoinHandle<RefreshOutcome>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Refresh already in flight, not starting another");
            return None;
        }
        self.started.fetch_add(1, Ordering::SeqCst);

        let this = self.clone();
        Some(tokio::spawn(async move {
            let _in_flight = InFlightGuard(this.in_flight.clone());
            this.run_once().await
        }))
    }

    async fn run_once(&self) -> RefreshOutcome {
        info!("🔄 Refreshing series in background");
        let series = self.coordinator.acquire_network().await;

        if series.is_empty() {
            info!("Background refresh found nothing new, keeping served series");
            return RefreshOutcome::Kept;
        }

        let series = Arc::new(series);
        if let Err(e) = self.cache.write(&series).await {
            warn!(error = %e, "Could not cache refreshed series");
        }
        self.state.publish(series.clone(), false);
        info!(
            source = %series.source,
            count = series.len(),
            "✅ Background refresh updated series"
        );
        RefreshOutcome::Updated
    }
}
