//! In-flight request gauge with peak tracking.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Atomic gauge of requests currently executing.
///
/// Clone-friendly wrapper shared between request tasks and the orchestrator.
/// Besides the current value it remembers the highest value ever observed,
/// which the orchestrator reports as the run's peak concurrency.
#[derive(Clone, Debug, Default)]
pub struct InFlightGauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl InFlightGauge {
    /// Creates a gauge at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one request as started and returns a guard that marks it
    /// finished when dropped.
    pub fn enter(&self) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            gauge: self.clone(),
        }
    }

    /// Requests currently executing.
    pub fn get(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Highest number of requests executing at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the owning [`InFlightGauge`] on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    gauge: InFlightGauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_tracks_current_and_peak() {
        let gauge = InFlightGauge::new();
        let a = gauge.enter();
        let b = gauge.enter();
        let c = gauge.enter();
        assert_eq!(gauge.get(), 3);
        drop(b);
        drop(a);
        assert_eq!(gauge.get(), 1);
        let d = gauge.enter();
        assert_eq!(gauge.get(), 2);
        assert_eq!(gauge.peak(), 3);
        drop(c);
        drop(d);
        assert_eq!(gauge.get(), 0);
        assert_eq!(gauge.peak(), 3);
    }

    #[test]
    fn test_clones_share_state() {
        let gauge = InFlightGauge::new();
        let clone = gauge.clone();
        let _guard = clone.enter();
        assert_eq!(gauge.get(), 1);
        assert_eq!(gauge.peak(), 1);
    }
}
