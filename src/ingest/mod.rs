// Ingestion boundary - canonical sample types
//
// Upstream acquisition services deliver readings as JSON with inconsistent
// field casing ("TIMESTAMP" vs "timestamp", "ALPHA" vs "alpha"). Everything
// is normalized into one typed Sample right here; no stringly-typed lookups
// propagate past this module.

pub mod mock;
pub mod source;

pub use mock::MockHeadband;
pub use source::SampleSource;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// EEG frequency bands carried by a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    Alpha,
    Beta,
    Theta,
    Delta,
    Gamma,
}

impl Band {
    /// Bands tracked by the baseline and the rolling buffers
    pub const TRACKED: [Band; 3] = [Band::Alpha, Band::Beta, Band::Theta];
}

/// One band-power reading per processed acquisition window
///
/// Immutable once created. Produced by the external signal-processing
/// collaborator; the optional ApEn fields are present when the upstream
/// service pre-computes entropy over its own buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(alias = "TIMESTAMP", alias = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(alias = "ALPHA", alias = "Alpha")]
    pub alpha: f64,
    #[serde(alias = "BETA", alias = "Beta")]
    pub beta: f64,
    #[serde(alias = "THETA", alias = "Theta")]
    pub theta: f64,
    #[serde(default, alias = "DELTA", alias = "Delta")]
    pub delta: f64,
    #[serde(default, alias = "GAMMA", alias = "Gamma")]
    pub gamma: f64,
    #[serde(default, alias = "ALPHA_APEN")]
    pub alpha_apen: Option<f64>,
    #[serde(default, alias = "BETA_APEN")]
    pub beta_apen: Option<f64>,
    #[serde(default, alias = "THETA_APEN")]
    pub theta_apen: Option<f64>,
}

impl Sample {
    /// Band power for one of the tracked bands
    pub fn band_power(&self, band: Band) -> f64 {
        match band {
            Band::Alpha => self.alpha,
            Band::Beta => self.beta,
            Band::Theta => self.theta,
            Band::Delta => self.delta,
            Band::Gamma => self.gamma,
        }
    }

    /// Pre-computed ApEn for a tracked band, if the upstream supplied it
    pub fn band_apen(&self, band: Band) -> Option<f64> {
        match band {
            Band::Alpha => self.alpha_apen,
            Band::Beta => self.beta_apen,
            Band::Theta => self.theta_apen,
            Band::Delta | Band::Gamma => None,
        }
    }
}
