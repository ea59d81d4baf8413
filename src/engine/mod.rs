// Pipeline engine - session state, evaluator task, and the control handle

pub mod core;

pub use core::{CognitiveState, EngineHandle, LoadState, PipelineEngine};
