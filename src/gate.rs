//! Readiness Gate - one-shot latch consumers can await
//!
//! Built on a `watch` channel: waiting is a genuine wakeup, not a timed
//! re-check. The gate holds the first non-empty value signaled in a load
//! cycle; `reset` starts a new cycle.

use std::time::Duration;
use tokio::sync::watch;

use crate::error::GateError;
use crate::types::Series;

/// Values that can satisfy the gate. Empty values never do.
pub trait Readiness {
    fn is_ready_value(&self) -> bool;
}

impl Readiness for Series {
    fn is_ready_value(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Readiness> Readiness for std::sync::Arc<T> {
    fn is_ready_value(&self) -> bool {
        (**self).is_ready_value()
    }
}

pub struct ReadinessGate<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> Default for ReadinessGate<T>
where
    T: Clone + Readiness,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReadinessGate<T>
where
    T: Clone + Readiness,
{
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Satisfy the gate with `value`.
    ///
    /// Ignored when the value is empty or the gate is already satisfied in
    /// this cycle. Returns whether the gate changed.
    pub fn signal_ready(&self, value: T) -> bool {
        if !value.is_ready_value() {
            return false;
        }
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            true
        })
    }

    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// The signaled value, if any, without waiting
    pub fn current(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// Wait up to `timeout` for the gate.
    ///
    /// Returns immediately if already satisfied. A timeout does not affect
    /// the gate; later signals still wake new waiters.
    pub async fn await_ready(&self, timeout: Duration) -> Result<T, GateError> {
        if let Some(value) = self.current() {
            return Ok(value);
        }

        let mut rx = self.tx.subscribe();
        let waited = tokio::time::timeout(timeout, async move {
            match rx.wait_for(|slot| slot.is_some()).await {
                Ok(slot) => (*slot).clone(),
                Err(_) => None,
            }
        })
        .await;

        match waited {
            Ok(Some(value)) => Ok(value),
            // the sender lives as long as the gate, so a closed channel only
            // happens during teardown
            Ok(None) | Err(_) => Err(GateError::Timeout(timeout)),
        }
    }

    /// Start a new load cycle
    pub fn reset(&self) {
        self.tx.send_replace(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SeriesPoint, SourceId};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use tokio_test::{assert_pending, assert_ready, task};

    fn series(n: usize) -> Arc<Series> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        Arc::new(Series::new(
            SourceId::Proxy,
            (0..n)
                .map(|i| SeriesPoint::new(start + chrono::Duration::days(i as i64), Decimal::ONE))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn concurrent_waiters_all_get_the_same_series() {
        let gate = Arc::new(ReadinessGate::<Arc<Series>>::new());

        let waiters: Vec<_> = (0..5)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.await_ready(Duration::from_secs(5)).await })
            })
            .collect();
        tokio::task::yield_now().await;

        let signaled = series(10);
        assert!(gate.signal_ready(signaled.clone()));

        for result in futures_util::future::join_all(waiters).await {
            let got = result.expect("task should not panic").expect("gate signaled");
            assert!(Arc::ptr_eq(&got, &signaled));
        }
    }

    #[tokio::test]
    async fn waiter_after_signal_resolves_immediately() {
        let gate = ReadinessGate::new();
        gate.signal_ready(series(3));

        let mut wait = task::spawn(gate.await_ready(Duration::ZERO));
        let got = assert_ready!(wait.poll());
        assert_eq!(got.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn zero_timeout_on_unsignaled_gate_fails() {
        let gate = ReadinessGate::<Arc<Series>>::new();
        let result = gate.await_ready(Duration::ZERO).await;
        assert_eq!(result.unwrap_err(), GateError::Timeout(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_leaves_gate_usable() {
        let gate = ReadinessGate::<Arc<Series>>::new();
        assert!(gate.await_ready(Duration::from_millis(50)).await.is_err());

        let mut late = task::spawn(gate.await_ready(Duration::from_secs(10)));
        assert_pending!(late.poll());

        gate.signal_ready(series(2));
        assert!(late.is_woken());
        assert_eq!(assert_ready!(late.poll()).unwrap().len(), 2);
    }

    #[test]
    fn empty_and_repeat_signals_are_ignored() {
        let gate = ReadinessGate::new();
        assert!(!gate.signal_ready(Arc::new(Series::empty())));
        assert!(!gate.is_ready());

        assert!(gate.signal_ready(series(2)));
        assert!(!gate.signal_ready(series(7)));
        assert_eq!(gate.current().unwrap().len(), 2);

        gate.reset();
        assert!(!gate.is_ready());
        assert!(gate.signal_ready(series(7)));
        assert_eq!(gate.current().unwrap().len(), 7);
    }
}
