//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. Key parameters for
//! the rolling buffers, ApEn estimation, baseline calibration, epoch
//! segmentation and the evaluator cadence can be adjusted via the config
//! file for rapid experimentation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub buffers: BufferConfig,
    pub apen: ApEnConfig,
    pub baseline: BaselineConfig,
    pub segmenting: SegmentConfig,
    pub evaluator: EvaluatorConfig,
    pub recording: RecordingConfig,
}

/// Rolling buffer parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Capacity of each per-band rolling buffer
    pub capacity: usize,
    /// Capacity of the producer -> evaluator sample ring
    pub ingest_queue_capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            ingest_queue_capacity: 256,
        }
    }
}

/// Approximate entropy estimation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApEnConfig {
    /// Embedding dimension m
    pub embedding_dim: usize,
    /// Minimum buffer length before ApEn is computed (below this the
    /// feature is absent for the tick, not zero)
    pub min_samples: usize,
    /// Tolerance multiplier applied to the population std-dev when no
    /// explicit tolerance is supplied
    pub tolerance_factor: f64,
}

impl Default for ApEnConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 2,
            min_samples: 11,
            tolerance_factor: 0.2,
        }
    }
}

/// Baseline calibration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Length of the calibration interval in seconds; the baseline is
    /// the mean of all samples observed within this window, frozen once
    pub calibration_secs: u64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            calibration_secs: 60,
        }
    }
}

/// Epoch segmentation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Fixed segment length in seconds
    pub segment_secs: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self { segment_secs: 3.0 }
    }
}

/// Periodic evaluator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Evaluation interval in milliseconds (0.5s - 3s is typical)
    pub interval_ms: u64,
    /// Bounded timeout for the upstream fetch in milliseconds
    pub fetch_timeout_ms: u64,
    /// Maximum number of readings requested per fetch
    pub fetch_limit: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            fetch_timeout_ms: 2000,
            fetch_limit: 10,
        }
    }
}

/// Recording session parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Path of the durable prediction log
    pub log_path: String,
    /// Lock acquisition retry budget before the session fails hard
    pub lock_retry_budget: u32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            log_path: "realtime_predictions.csv".to_string(),
            lock_retry_budget: 5,
        }
    }
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            buffers: BufferConfig::default(),
            apen: ApEnConfig::default(),
            baseline: BaselineConfig::default(),
            segmenting: SegmentConfig::default(),
            evaluator: EvaluatorConfig::default(),
            recording: RecordingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// Falls back to defaults with a warning if the file is missing or
    /// the JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
