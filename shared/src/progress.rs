//! Timed progress sequence shown while an analysis runs.
//!
//! Progress is feedback only. The steps are awaited one after another on an
//! injected [`Ticker`], so tests can fast-forward them with [`InstantTicker`].

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub const PROGRESS_COMPLETE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSchedule {
    pub step: u8,
    pub interval: Duration,
}

impl Default for ProgressSchedule {
    fn default() -> Self {
        Self {
            step: 10,
            interval: Duration::from_millis(200),
        }
    }
}

impl ProgressSchedule {
    pub fn new(step: u8, interval: Duration) -> Self {
        Self {
            step: step.clamp(1, PROGRESS_COMPLETE),
            interval,
        }
    }

    /// 0, step, 2*step, ... always ending on exactly 100.
    pub fn steps(&self) -> ProgressSteps {
        ProgressSteps {
            next: Some(0),
            step: self.step.max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressSteps {
    next: Option<u8>,
    step: u8,
}

impl Iterator for ProgressSteps {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let current = self.next?;
        self.next = if current >= PROGRESS_COMPLETE {
            None
        } else {
            Some(current.saturating_add(self.step).min(PROGRESS_COMPLETE))
        };
        Some(current)
    }
}

/// Suspends the caller for one progress interval.
#[async_trait(?Send)]
pub trait Ticker: Send + Sync {
    async fn tick(&self, interval: Duration);
}

/// Returns immediately. Used where the visual delay is unwanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantTicker;

#[async_trait(?Send)]
impl Ticker for InstantTicker {
    async fn tick(&self, _interval: Duration) {}
}

/// Shared flag for logically cancelling a running analysis.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule_counts_by_ten() {
        let steps: Vec<u8> = ProgressSchedule::default().steps().collect();
        assert_eq!(steps, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
    }

    #[test]
    fn test_uneven_step_still_ends_on_hundred() {
        let steps: Vec<u8> = ProgressSchedule::new(30, Duration::ZERO).steps().collect();
        assert_eq!(steps, vec![0, 30, 60, 90, 100]);
    }

    #[test]
    fn test_step_is_clamped() {
        let schedule = ProgressSchedule::new(0, Duration::ZERO);
        assert_eq!(schedule.step, 1);
        assert_eq!(schedule.steps().count(), 101);
        let schedule = ProgressSchedule::new(250, Duration::ZERO);
        let steps: Vec<u8> = schedule.steps().collect();
        assert_eq!(steps, vec![0, 100]);
    }

    #[test]
    fn test_cancel_handle_is_shared() {
        let handle = CancelHandle::default();
        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
        handle.clear();
        assert!(!clone.is_cancelled());
    }
}
