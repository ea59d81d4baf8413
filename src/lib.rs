// Cogload Core - Real-time Cognitive Load Pipeline
// Streaming EEG band powers to bounded-latency load classification

// Module declarations
pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod session;

#[cfg(feature = "debug_http")]
pub mod http;

// Re-exports for convenience
pub use analysis::{
    ApEnEstimator, BaselineTracker, ClassificationEngine, ClassificationEvent, DecisionFn,
    FeatureVector, LoadLabel, RollingBuffer, SegmentAggregator, ThresholdModel,
};
pub use config::AppConfig;
pub use engine::{CognitiveState, EngineHandle, LoadState, PipelineEngine};
pub use error::{ErrorCode, PipelineError, RecordingError};
pub use ingest::{Band, MockHeadband, Sample, SampleSource};
pub use session::{EventLog, RecordingSession};
