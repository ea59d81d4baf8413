// Analysis pipeline - signal features and classification
//
// Stages, leaves first: rolling band-power windows, approximate entropy,
// baseline tracking, cognitive index, epoch segmentation, and the
// classification engine that turns a feature vector into a load label.

pub mod apen;
pub mod baseline;
pub mod classifier;
pub mod index;
pub mod rolling;
pub mod segment;

pub use apen::ApEnEstimator;
pub use baseline::{Baseline, BaselineTracker};
pub use classifier::{
    ClassificationEngine, ClassificationEvent, DecisionFn, FeatureVector, LoadLabel,
    ThresholdModel,
};
pub use index::cognitive_index;
pub use rolling::RollingBuffer;
pub use segment::{Segment, SegmentAggregator};
