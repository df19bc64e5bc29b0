//! Price Loader - the entry point the host application calls
//!
//! `initialize()` tries the freshness cache, then the fallback chain, and
//! publishes the result to the load state and the readiness gate. Callers
//! that only need to wait for data use `wait_for_data()`.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::acquisition::sources::SeriesSource;
use crate::acquisition::{BackgroundRefresher, FallbackCoordinator, RefreshOutcome};
use crate::cache::FreshnessCache;
use crate::config::AppConfig;
use crate::error::GateError;
use crate::gate::ReadinessGate;
use crate::state::{DataStatus, LoadSnapshot, LoadState};
use crate::types::Series;

pub struct PriceLoader {
    coordinator: Arc<FallbackCoordinator>,
    cache: Arc<FreshnessCache>,
    state: Arc<LoadState>,
    gate: ReadinessGate<Arc<Series>>,
    refresher: BackgroundRefresher,
    background_refresh: bool,
    wait_timeout: Duration,
    /// One acquisition pipeline at a time
    init_lock: Mutex<()>,
    pending_refresh: StdMutex<Option<JoinHandle<RefreshOutcome>>>,
}

impl PriceLoader {
    pub fn new(
        coordinator: FallbackCoordinator,
        cache: FreshnessCache,
        background_refresh: bool,
        wait_timeout: Duration,
    ) -> Self {
        let coordinator = Arc::new(coordinator);
        let cache = Arc::new(cache);
        let state = Arc::new(LoadState::new());
        let refresher = BackgroundRefresher::new(coordinator.clone(), cache.clone(), state.clone());

        Self {
            coordinator,
            cache,
            state,
            gate: ReadinessGate::new(),
            refresher,
            background_refresh,
            wait_timeout,
            init_lock: Mutex::new(()),
            pending_refresh: StdMutex::new(None),
        }
    }

    /// Wire the loader from configuration and an explicit source chain
    pub fn from_config(config: &AppConfig, sources: Vec<Arc<dyn SeriesSource>>) -> Self {
        let min_len = config.loader.min_acceptable_len;
        let floor = config
            .sources
            .date_floor()
            .unwrap_or(chrono::NaiveDate::MIN);
        let coordinator = FallbackCoordinator::new(
            sources,
            floor,
            min_len,
            config.sources.request_timeout(),
        );
        let cache = FreshnessCache::from_config(&config.cache, min_len);

        Self::new(
            coordinator,
            cache,
            config.loader.background_refresh,
            config.loader.wait_timeout(),
        )
    }

    /// Load the series once.
    ///
    /// Later calls return the loaded series without doing any work. A failed
    /// load (empty series) is retried on the next call.
    pub async fn initialize(&self) -> Arc<Series> {
        let _guard = self.init_lock.lock().await;

        let snapshot = self.state.snapshot();
        if snapshot.is_ready() {
            // a refresh may have published after a reload reset the gate
            self.gate.signal_ready(snapshot.series.clone());
            return snapshot.series.clone();
        }
        self.state.begin_loading();

        // Fast path: fresh cache entry
        if let Some(entry) = self.cache.read().await {
            let series = Arc::new(entry.series);
            self.state.publish(series.clone(), true);
            self.gate.signal_ready(series.clone());
            if self.background_refresh {
                self.start_refresh();
            }
            return series;
        }

        let series = Arc::new(self.coordinator.acquire().await);
        if series.is_empty() {
            error!("❌ Failed to load any price data");
            self.state.publish(series.clone(), false);
            return series;
        }

        // Bundled data is always available, so it is never worth caching
        if series.source.is_network() {
            if let Err(e) = self.cache.write(&series).await {
                warn!(error = %e, "Could not cache series");
            }
        }

        self.state.publish(series.clone(), false);
        self.gate.signal_ready(series.clone());
        info!(source = %series.source, count = series.len(), "Price data ready");
        series
    }

    /// Run `initialize` on its own task.
    ///
    /// The load keeps going even if every waiter gives up.
    pub fn spawn_initialize(self: &Arc<Self>) -> JoinHandle<Arc<Series>> {
        let this = self.clone();
        tokio::spawn(async move { this.initialize().await })
    }

    /// Wait for data with the configured default timeout
    pub async fn wait_for_data(&self) -> Result<Arc<Series>, GateError> {
        self.wait_for_data_within(self.wait_timeout).await
    }

    /// Wait until the first load of this cycle has published data.
    ///
    /// Returns the latest series, which may already be a refreshed one.
    pub async fn wait_for_data_within(&self, timeout: Duration) -> Result<Arc<Series>, GateError> {
        let signaled = self.gate.await_ready(timeout).await?;
        let current = self.state.series();
        Ok(if current.is_empty() { signaled } else { current })
    }

    /// Start a new load cycle and load again
    pub async fn reload(&self) -> Arc<Series> {
        {
            let _guard = self.init_lock.lock().await;
            self.gate.reset();
            self.state.reset();
        }
        self.initialize().await
    }

    /// Wait for the background refresh started by the last cache hit, if any
    pub async fn settle_refresh(&self) -> Option<RefreshOutcome> {
        let handle = self
            .pending_refresh
            .lock()
            .ok()
            .and_then(|mut pending| pending.take())?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "Background refresh task ended abnormally");
                None
            }
        }
    }

    pub fn snapshot(&self) -> Arc<LoadSnapshot> {
        self.state.snapshot()
    }

    pub fn status(&self) -> DataStatus {
        self.state.status()
    }

    pub fn refresher(&self) -> &BackgroundRefresher {
        &self.refresher
    }

    pub fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    fn start_refresh(&self) {
        if let Some(handle) = self.refresher.refresh_async() {
            if let Ok(mut pending) = self.pending_refresh.lock() {
                *pending = Some(handle);
            }
        }
    }
}
