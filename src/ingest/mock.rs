// MockHeadband - synthetic band-power source
//
// Stand-in for the physical headband driver during development and tests,
// mirroring the duplicated mock acquisition servers the deployment runs
// when no sensor is paired. Emits readings around per-state base levels
// (calm / focused / stressed) with uniform jitter, plus pre-computed ApEn
// over a jittered 20-point window.

use chrono::{Duration as ChronoDuration, Utc};
use futures::future::BoxFuture;
use rand::Rng;

use crate::analysis::apen::ApEnEstimator;
use crate::error::PipelineError;
use crate::ingest::{Sample, SampleSource};

/// Spacing between consecutive synthetic readings, in milliseconds
const READING_SPACING_MS: i64 = 300;

/// Cognitive state profile the generator draws around
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockProfile {
    Calm,
    Focused,
    Stressed,
}

impl MockProfile {
    /// Base band-power levels (alpha, beta, theta)
    fn base_levels(self) -> (f64, f64, f64) {
        match self {
            MockProfile::Calm => (40.0, 20.0, 15.0),
            MockProfile::Focused => (30.0, 35.0, 10.0),
            MockProfile::Stressed => (20.0, 40.0, 25.0),
        }
    }
}

/// Synthetic headband source
pub struct MockHeadband {
    profile: MockProfile,
    apen: ApEnEstimator,
}

impl MockHeadband {
    pub fn new(profile: MockProfile) -> Self {
        Self {
            profile,
            apen: ApEnEstimator::default(),
        }
    }

    /// Jittered ApEn input window around a base level
    fn apen_of_jittered(&self, base: f64) -> Option<f64> {
        let mut rng = rand::thread_rng();
        let window: Vec<f64> = (0..20)
            .map(|_| base + rng.gen_range(-2.0..2.0))
            .collect();
        self.apen.estimate(&window).ok()
    }

    fn generate_reading(&self, offset_ms: i64) -> Sample {
        let (base_alpha, base_beta, base_theta) = self.profile.base_levels();
        let mut rng = rand::thread_rng();

        let alpha = (base_alpha + rng.gen_range(-5.0..5.0)).max(0.0);
        let beta = (base_beta + rng.gen_range(-5.0..5.0)).max(0.0);
        let theta = (base_theta + rng.gen_range(-5.0..5.0)).max(0.0);

        Sample {
            timestamp: Utc::now() - ChronoDuration::milliseconds(offset_ms),
            alpha,
            beta,
            theta,
            delta: (rng.gen_range(5.0..15.0) as f64).max(0.0),
            gamma: (rng.gen_range(1.0..8.0) as f64).max(0.0),
            alpha_apen: self.apen_of_jittered(alpha),
            beta_apen: self.apen_of_jittered(beta),
            theta_apen: self.apen_of_jittered(theta),
        }
    }
}

impl SampleSource for MockHeadband {
    fn fetch_recent(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Sample>, PipelineError>> {
        Box::pin(async move {
            // Oldest first, most recent last, emulating the acquisition
            // service's ~0.3s cadence
            let readings = (0..limit)
                .rev()
                .map(|i| self.generate_reading(i as i64 * READING_SPACING_MS))
                .collect();
            Ok(readings)
        })
    }
}
