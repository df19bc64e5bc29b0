//! Load state shared between the loader, the refresher and readers
//!
//! Readers take `Arc` snapshots; writers swap in a whole new snapshot, so a
//! reader sees either the state before or after an update, never a mix.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::types::{Series, SourceId};

/// Lifecycle of one loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadPhase {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPhase::Uninitialized => write!(f, "uninitialized"),
            LoadPhase::Loading => write!(f, "loading"),
            LoadPhase::Ready => write!(f, "ready"),
            LoadPhase::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadSnapshot {
    pub phase: LoadPhase,
    pub series: Arc<Series>,
    /// Served from the freshness cache rather than a live fetch
    pub from_cache: bool,
}

impl LoadSnapshot {
    fn initial() -> Self {
        Self {
            phase: LoadPhase::Uninitialized,
            series: Arc::new(Series::empty()),
            from_cache: false,
        }
    }

    pub fn source(&self) -> SourceId {
        self.series.source
    }

    pub fn is_ready(&self) -> bool {
        self.phase == LoadPhase::Ready && !self.series.is_empty()
    }
}

pub struct LoadState {
    current: RwLock<Arc<LoadSnapshot>>,
}

impl Default for LoadState {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadState {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(LoadSnapshot::initial())),
        }
    }

    pub fn snapshot(&self) -> Arc<LoadSnapshot> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.snapshot().phase
    }

    pub fn series(&self) -> Arc<Series> {
        self.snapshot().series.clone()
    }

    pub fn status(&self) -> DataStatus {
        DataStatus::from_snapshot(&self.snapshot())
    }

    pub(crate) fn begin_loading(&self) {
        let prev = self.snapshot();
        self.replace(LoadSnapshot {
            phase: LoadPhase::Loading,
            series: prev.series.clone(),
            from_cache: prev.from_cache,
        });
    }

    /// Publish an accepted series (or the empty terminal one)
    pub(crate) fn publish(&self, series: Arc<Series>, from_cache: bool) {
        let phase = if series.is_empty() {
            LoadPhase::Failed
        } else {
            LoadPhase::Ready
        };
        self.replace(LoadSnapshot {
            phase,
            series,
            from_cache,
        });
    }

    pub(crate) fn reset(&self) {
        self.replace(LoadSnapshot::initial());
    }

    fn replace(&self, next: LoadSnapshot) {
        let next = Arc::new(next);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

/// Summary of what is currently loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataStatus {
    pub phase: LoadPhase,
    pub source: SourceId,
    pub from_cache: bool,
    pub count: usize,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DataStatus {
    pub fn from_snapshot(snapshot: &LoadSnapshot) -> Self {
        let span = snapshot.series.date_span();
        Self {
            phase: snapshot.phase,
            source: snapshot.series.source,
            from_cache: snapshot.from_cache,
            count: snapshot.series.len(),
            start: span.map(|(s, _)| s),
            end: span.map(|(_, e)| e),
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }

    /// Source label as shown on the dashboard (`cache-coingecko`, `proxy`, ...)
    pub fn source_label(&self) -> String {
        if self.from_cache {
            format!("cache-{}", self.source)
        } else {
            self.source.to_string()
        }
    }
}

impl fmt::Display for DataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(start), Some(end)) if self.has_data() => write!(
                f,
                "{} days from {} ({} to {})",
                self.count,
                self.source_label(),
                start,
                end
            ),
            _ if self.phase == LoadPhase::Loading || self.phase == LoadPhase::Uninitialized => {
                write!(f, "Price data loading...")
            }
            _ => write!(f, "No price data available"),
        }
    }
}
