// Error types for the cognitive load pipeline
//
// This module defines custom error types for pipeline and recording
// operations, providing structured error handling with numeric error codes.
//
// Every pipeline error is tick-local: the evaluator logs it, skips the
// current tick and retries at the next interval. The only hard failure is
// RecordingError::LockTimeout, which the surrounding process treats as a
// session failure.

use log::error;
use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// module boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Log a pipeline error with structured context
///
/// Logs the numeric code alongside the message so downstream log scraping
/// can match on codes instead of message text.
pub fn log_pipeline_error(err: &PipelineError, context: &str) {
    error!(
        "Pipeline error in {}: code={}, component=PipelineEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Log a recording error with structured context
pub fn log_recording_error(err: &RecordingError, context: &str) {
    error!(
        "Recording error in {}: code={}, component=RecordingSession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Tick-local pipeline errors
///
/// These errors cover feature computation and sample ingestion. None of
/// them aborts the session; the affected tick is skipped and the cognitive
/// state degrades to Unknown.
///
/// Error code range: 1001-1007
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Buffer below the minimum length required for ApEn
    InsufficientData { required: usize, available: usize },

    /// Baseline has not frozen yet
    NotReady,

    /// Baseline value is zero, cognitive index undefined
    DivisionByZero,

    /// Sample timestamp regressed relative to the previous sample
    OutOfOrderSample { details: String },

    /// A required feature (CI or ApEn) is absent for this tick
    FeatureUnavailable { feature: String },

    /// Upstream data source did not respond within the bounded timeout
    UpstreamTimeout { timeout_ms: u64 },

    /// Upstream data source returned an error
    SourceUnavailable { details: String },
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::InsufficientData { .. } => 1001,
            PipelineError::NotReady => 1002,
            PipelineError::DivisionByZero => 1003,
            PipelineError::OutOfOrderSample { .. } => 1004,
            PipelineError::FeatureUnavailable { .. } => 1005,
            PipelineError::UpstreamTimeout { .. } => 1006,
            PipelineError::SourceUnavailable { .. } => 1007,
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::InsufficientData {
                required,
                available,
            } => {
                format!("Insufficient data: need {}, got {}", required, available)
            }
            PipelineError::NotReady => "Baseline not frozen yet".to_string(),
            PipelineError::DivisionByZero => {
                "Baseline is zero, cognitive index undefined".to_string()
            }
            PipelineError::OutOfOrderSample { details } => {
                format!("Out-of-order sample rejected: {}", details)
            }
            PipelineError::FeatureUnavailable { feature } => {
                format!("Feature unavailable for this tick: {}", feature)
            }
            PipelineError::UpstreamTimeout { timeout_ms } => {
                format!("Upstream fetch timed out after {} ms", timeout_ms)
            }
            PipelineError::SourceUnavailable { details } => {
                format!("Upstream source unavailable: {}", details)
            }
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PipelineError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for PipelineError {}

/// Recording session errors
///
/// These errors cover the event log and recording state machine.
///
/// Error code range: 2001-2004
#[derive(Debug)]
pub enum RecordingError {
    /// start() while already recording (benign, start is idempotent)
    AlreadyRecording,

    /// Event log I/O failure
    Io(std::io::Error),

    /// Log lock could not be acquired within the retry budget
    LockTimeout { attempts: u32 },

    /// Log lock was poisoned by a panicking writer
    Poisoned,
}

impl ErrorCode for RecordingError {
    fn code(&self) -> i32 {
        match self {
            RecordingError::AlreadyRecording => 2001,
            RecordingError::Io(_) => 2002,
            RecordingError::LockTimeout { .. } => 2003,
            RecordingError::Poisoned => 2004,
        }
    }

    fn message(&self) -> String {
        match self {
            RecordingError::AlreadyRecording => "Recording already in progress".to_string(),
            RecordingError::Io(err) => format!("Event log I/O error: {}", err),
            RecordingError::LockTimeout { attempts } => {
                format!("Event log lock not acquired after {} attempts", attempts)
            }
            RecordingError::Poisoned => "Event log lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RecordingError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for RecordingError {}

impl From<std::io::Error> for RecordingError {
    fn from(err: std::io::Error) -> Self {
        RecordingError::Io(err)
    }
}
