// ClassificationEngine - feature vector assembly and load labeling
//
// The decision boundary itself is an externally trained artifact consumed
// as an opaque function (FeatureVector -> 0|1). This module's job is to
// produce a well-formed feature vector in the exact order the artifact was
// trained on (CI_Alpha, alpha_apen, beta_apen, theta_apen), refuse to
// classify when a required feature is absent, and attach a confidence
// score derived from the stability of the recent alpha window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::analysis::apen::population_std_dev;
use crate::error::PipelineError;

/// Binary cognitive load label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadLabel {
    Low,
    High,
}

impl LoadLabel {
    pub fn from_prediction(prediction: u8) -> Self {
        if prediction == 1 {
            LoadLabel::High
        } else {
            LoadLabel::Low
        }
    }

    /// Label string written to the event log
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadLabel::Low => "Low Load",
            LoadLabel::High => "High Load",
        }
    }
}

/// Features for one evaluation tick, in artifact order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub ci_alpha: f64,
    pub alpha_apen: Option<f64>,
    pub beta_apen: Option<f64>,
    pub theta_apen: Option<f64>,
}

impl FeatureVector {
    /// Validate presence of every required feature
    ///
    /// The artifact was trained with all four columns; substituting a
    /// default for a missing one would silently shift the decision
    /// boundary, so the tick is skipped instead.
    pub fn require_complete(&self) -> Result<(), PipelineError> {
        for (name, value) in [
            ("alpha_apen", self.alpha_apen),
            ("beta_apen", self.beta_apen),
            ("theta_apen", self.theta_apen),
        ] {
            if value.is_none() {
                return Err(PipelineError::FeatureUnavailable {
                    feature: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Opaque externally trained decision function
pub trait DecisionFn: Send + Sync {
    /// Predict 0 (low load) or 1 (high load)
    fn decide(&self, features: &FeatureVector) -> u8;
}

/// Alpha-CI threshold artifact
///
/// The simplest deployable decision boundary: predict high load when the
/// alpha cognitive index exceeds the trained threshold. Stored as a JSON
/// artifact by the offline training procedure; loaded here as the concrete
/// opaque model. Richer artifacts implement `DecisionFn` the same way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdModel {
    /// Decision threshold on CI_Alpha (percent)
    pub ci_alpha_threshold: f64,
}

impl ThresholdModel {
    /// Load a trained artifact from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let contents = fs::read_to_string(&path).map_err(|err| {
            PipelineError::SourceUnavailable {
                details: format!("model artifact {:?}: {}", path.as_ref(), err),
            }
        })?;
        serde_json::from_str(&contents).map_err(|err| PipelineError::SourceUnavailable {
            details: format!("model artifact {:?}: {}", path.as_ref(), err),
        })
    }
}

impl DecisionFn for ThresholdModel {
    fn decide(&self, features: &FeatureVector) -> u8 {
        if features.ci_alpha > self.ci_alpha_threshold {
            1
        } else {
            0
        }
    }
}

/// One classification result, appended to the event log exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEvent {
    pub timestamp: DateTime<Utc>,
    pub ci_alpha: f64,
    pub alpha_apen: Option<f64>,
    pub beta_apen: Option<f64>,
    pub theta_apen: Option<f64>,
    /// Raw artifact output: 0 or 1
    pub prediction: u8,
    pub label: LoadLabel,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

/// Applies the trained decision function to complete feature vectors
pub struct ClassificationEngine {
    model: Arc<dyn DecisionFn>,
}

impl ClassificationEngine {
    pub fn new(model: Arc<dyn DecisionFn>) -> Self {
        Self { model }
    }

    /// Classify one tick
    ///
    /// Fails with `FeatureUnavailable` when any required feature is
    /// absent; no event is produced for that tick.
    pub fn classify(
        &self,
        timestamp: DateTime<Utc>,
        features: &FeatureVector,
        recent_alpha: &[f64],
    ) -> Result<ClassificationEvent, PipelineError> {
        features.require_complete()?;

        let prediction = self.model.decide(features);
        let label = LoadLabel::from_prediction(prediction);
        let confidence = confidence_from_alpha_window(recent_alpha);

        Ok(ClassificationEvent {
            timestamp,
            ci_alpha: features.ci_alpha,
            alpha_apen: features.alpha_apen,
            beta_apen: features.beta_apen,
            theta_apen: features.theta_apen,
            prediction,
            label,
            confidence,
        })
    }
}

/// Confidence heuristic: clamp(1 - stddev/mean, 0, 1) over the recent
/// alpha window when its mean is positive, else 0
///
/// This is a placeholder stability measure, not a calibrated probability;
/// it should be validated against labeled sessions before being treated
/// as one.
pub fn confidence_from_alpha_window(recent_alpha: &[f64]) -> f64 {
    if recent_alpha.is_empty() {
        return 0.0;
    }
    let mean = recent_alpha.iter().sum::<f64>() / recent_alpha.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    (1.0 - population_std_dev(recent_alpha) / mean).clamp(0.0, 1.0)
}
