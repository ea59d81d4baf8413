// BaselineTracker - "calm" reference levels from the calibration interval
//
// The first 60 seconds of a session (configurable) establish the per-band
// reference the cognitive index is measured against. The tracker
// accumulates running means while the calibration window is open, freezes
// exactly once when the boundary is crossed (or when the session ends
// early), and ignores every observation after the freeze. The baseline is
// never recomputed mid-session.

use chrono::{DateTime, Utc};
use log::{info, warn};
use std::time::Duration;

use crate::error::PipelineError;
use crate::ingest::{Band, Sample};

/// A frozen per-band reference value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub band: Band,
    pub value: f64,
    pub frozen_at: DateTime<Utc>,
}

/// Per-band running mean accumulator
#[derive(Debug, Clone, Copy, Default)]
struct RunningMean {
    sum: f64,
    count: u64,
}

impl RunningMean {
    fn observe(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Tracks and freezes the calibration baseline
#[derive(Debug, Clone)]
pub struct BaselineTracker {
    calibration_window: Duration,
    alpha: RunningMean,
    beta: RunningMean,
    theta: RunningMean,
    frozen_at: Option<DateTime<Utc>>,
}

impl BaselineTracker {
    pub fn new(calibration_window: Duration) -> Self {
        Self {
            calibration_window,
            alpha: RunningMean::default(),
            beta: RunningMean::default(),
            theta: RunningMean::default(),
            frozen_at: None,
        }
    }

    /// Feed one sample with its offset from session start
    ///
    /// While `elapsed` is inside the calibration window the per-band means
    /// accumulate. The first observation past the boundary freezes the
    /// tracker (that sample is not included). After the freeze this is a
    /// no-op.
    pub fn observe(&mut self, sample: &Sample, elapsed: Duration) {
        if self.frozen_at.is_some() {
            return;
        }

        if elapsed > self.calibration_window {
            self.freeze();
            return;
        }

        self.alpha.observe(sample.alpha);
        self.beta.observe(sample.beta);
        self.theta.observe(sample.theta);
    }

    /// Freeze early, e.g. when the session ends before the boundary
    ///
    /// No-op if already frozen. Fails with `NotReady` when nothing was
    /// observed, leaving the tracker unfrozen.
    pub fn freeze_now(&mut self) -> Result<(), PipelineError> {
        if self.frozen_at.is_some() {
            return Ok(());
        }
        if self.alpha.count == 0 {
            warn!("[Baseline] freeze requested with no observations");
            return Err(PipelineError::NotReady);
        }
        self.freeze();
        Ok(())
    }

    fn freeze(&mut self) {
        let now = Utc::now();
        self.frozen_at = Some(now);
        info!(
            "[Baseline] frozen at {} after {} samples: alpha={:?} beta={:?} theta={:?}",
            now,
            self.alpha.count,
            self.alpha.mean(),
            self.beta.mean(),
            self.theta.mean()
        );
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_at.is_some()
    }

    /// Frozen reference value for one band
    ///
    /// Fails with `NotReady` before the freeze.
    pub fn value(&self, band: Band) -> Result<f64, PipelineError> {
        if self.frozen_at.is_none() {
            return Err(PipelineError::NotReady);
        }
        let mean = match band {
            Band::Alpha => self.alpha.mean(),
            Band::Beta => self.beta.mean(),
            Band::Theta => self.theta.mean(),
            // Delta/gamma are not baselined
            Band::Delta | Band::Gamma => None,
        };
        mean.ok_or(PipelineError::NotReady)
    }

    /// Frozen baseline record for one band
    pub fn baseline(&self, band: Band) -> Result<Baseline, PipelineError> {
        let frozen_at = self.frozen_at.ok_or(PipelineError::NotReady)?;
        Ok(Baseline {
            band,
            value: self.value(band)?,
            frozen_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(alpha: f64, beta: f64, theta: f64) -> Sample {
        Sample {
            timestamp: Utc::now(),
            alpha,
            beta,
            theta,
            delta: 0.0,
            gamma: 0.0,
            alpha_apen: None,
            beta_apen: None,
            theta_apen: None,
        }
    }

    fn window() -> Duration {
        Duration::from_secs(60)
    }

    #[test]
    fn test_not_ready_before_freeze() {
        let tracker = BaselineTracker::new(window());
        match tracker.value(Band::Alpha) {
            Err(PipelineError::NotReady) => {}
            other => panic!("Expected NotReady, got {:?}", other),
        }
    }

    #[test]
    fn test_mean_over_calibration_window() {
        let mut tracker = BaselineTracker::new(window());
        tracker.observe(&sample(40.0, 20.0, 10.0), Duration::from_secs(10));
        tracker.observe(&sample(60.0, 30.0, 20.0), Duration::from_secs(30));
        // Boundary crossing freezes; this sample is excluded
        tracker.observe(&sample(999.0, 999.0, 999.0), Duration::from_secs(61));

        assert!(tracker.is_frozen());
        assert_eq!(tracker.value(Band::Alpha).unwrap(), 50.0);
        assert_eq!(tracker.value(Band::Beta).unwrap(), 25.0);
        assert_eq!(tracker.value(Band::Theta).unwrap(), 15.0);
    }

    #[test]
    fn test_observe_after_freeze_is_noop() {
        let mut tracker = BaselineTracker::new(window());
        tracker.observe(&sample(50.0, 25.0, 12.0), Duration::from_secs(5));
        tracker.freeze_now().unwrap();

        let before = tracker.value(Band::Alpha).unwrap();
        tracker.observe(&sample(500.0, 500.0, 500.0), Duration::from_secs(70));
        let after = tracker.value(Band::Alpha).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_sample_at_exact_boundary_is_included() {
        let mut tracker = BaselineTracker::new(window());
        tracker.observe(&sample(10.0, 1.0, 1.0), Duration::from_secs(60));
        assert!(!tracker.is_frozen());

        tracker.observe(&sample(20.0, 1.0, 1.0), Duration::from_millis(60_001));
        assert!(tracker.is_frozen());
        assert_eq!(tracker.value(Band::Alpha).unwrap(), 10.0);
    }

    #[test]
    fn test_freeze_now_without_observations_fails() {
        let mut tracker = BaselineTracker::new(window());
        match tracker.freeze_now() {
            Err(PipelineError::NotReady) => {}
            other => panic!("Expected NotReady, got {:?}", other),
        }
        assert!(!tracker.is_frozen());
    }

    #[test]
    fn test_freeze_now_is_idempotent() {
        let mut tracker = BaselineTracker::new(window());
        tracker.observe(&sample(42.0, 21.0, 14.0), Duration::from_secs(1));
        tracker.freeze_now().unwrap();
        let frozen_value = tracker.value(Band::Alpha).unwrap();

        tracker.freeze_now().unwrap();
        assert_eq!(tracker.value(Band::Alpha).unwrap(), frozen_value);
    }

    #[test]
    fn test_baseline_record_carries_band_and_instant() {
        let mut tracker = BaselineTracker::new(window());
        tracker.observe(&sample(42.0, 21.0, 14.0), Duration::from_secs(1));
        tracker.freeze_now().unwrap();

        let baseline = tracker.baseline(Band::Beta).unwrap();
        assert_eq!(baseline.band, Band::Beta);
        assert_eq!(baseline.value, 21.0);
    }
}
