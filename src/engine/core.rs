//! PipelineEngine: the session object owning every pipeline stage.
//!
//! All mutable state (rolling buffers, baseline tracker, segment
//! aggregator) lives inside the engine and is touched only by the
//! evaluator task; nothing is ambient or global. External code interacts
//! through an `EngineHandle`: watch channels for the latest state, a
//! broadcast channel for event subscribers, and the recording controls.
//!
//! Two paths feed the engine. Push-style producers write into a lock-free
//! SPSC ring (`ingress()`), drained at the start of each tick. Pull-style,
//! the engine fetches the last K readings from its `SampleSource` under a
//! bounded timeout. Either way a tick that cannot produce a classification
//! skips cleanly and the next tick starts fresh.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

use crate::analysis::{
    cognitive_index, ApEnEstimator, BaselineTracker, ClassificationEngine, ClassificationEvent,
    DecisionFn, FeatureVector, RollingBuffer, Segment, SegmentAggregator,
};
use crate::config::AppConfig;
use crate::error::{log_pipeline_error, PipelineError, RecordingError};
use crate::ingest::source::fetch_with_timeout;
use crate::ingest::{Band, Sample, SampleSource};
use crate::session::{EventLog, RecordingSession};

/// User-visible load state; degrades to Unknown instead of going stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    Low,
    High,
    Unknown,
}

/// Downstream "cognitive state" summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveState {
    pub load: LoadState,
    pub confidence: f64,
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for CognitiveState {
    fn default() -> Self {
        Self {
            load: LoadState::Unknown,
            confidence: 0.0,
            last_update: None,
        }
    }
}

/// Clone-able control/read facade over a running engine
#[derive(Clone)]
pub struct EngineHandle {
    state_rx: watch::Receiver<CognitiveState>,
    latest_rx: watch::Receiver<Option<ClassificationEvent>>,
    events_tx: broadcast::Sender<ClassificationEvent>,
    session: Arc<RecordingSession>,
    shutdown_tx: watch::Sender<bool>,
}

impl EngineHandle {
    /// Current cognitive state (Low | High | Unknown, confidence, last update)
    pub fn cognitive_state(&self) -> CognitiveState {
        self.state_rx.borrow().clone()
    }

    /// Most recent classification event, if any was produced this session
    pub fn latest_classification(&self) -> Option<ClassificationEvent> {
        self.latest_rx.borrow().clone()
    }

    /// Subscribe to the live event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<ClassificationEvent> {
        self.events_tx.subscribe()
    }

    pub fn start_recording(&self) -> Result<(), RecordingError> {
        self.session.start()
    }

    pub fn stop_recording(&self) -> Result<(), RecordingError> {
        self.session.stop()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    /// Request a clean shutdown; the evaluator finishes or abandons the
    /// current tick and returns
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// The signal-to-decision pipeline for one session
pub struct PipelineEngine {
    config: AppConfig,
    source: Arc<dyn SampleSource>,
    classifier: ClassificationEngine,
    apen: ApEnEstimator,
    session: Arc<RecordingSession>,

    alpha_buffer: RollingBuffer,
    beta_buffer: RollingBuffer,
    theta_buffer: RollingBuffer,
    baseline: BaselineTracker,
    aggregator: SegmentAggregator,

    session_start: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
    /// Most recently finalized, not yet classified segment
    pending_segment: Option<Segment>,

    ingress_consumer: rtrb::Consumer<Sample>,
    ingress_producer: Option<rtrb::Producer<Sample>>,

    state_tx: watch::Sender<CognitiveState>,
    latest_tx: watch::Sender<Option<ClassificationEvent>>,
    events_tx: broadcast::Sender<ClassificationEvent>,
    shutdown_rx: watch::Receiver<bool>,
    handle: EngineHandle,
}

impl PipelineEngine {
    /// Build an engine and its control handle
    pub fn new(
        config: AppConfig,
        source: Arc<dyn SampleSource>,
        model: Arc<dyn DecisionFn>,
    ) -> Result<Self, RecordingError> {
        let log = EventLog::create(&config.recording.log_path, config.recording.lock_retry_budget)?;
        let session = Arc::new(RecordingSession::new(log));

        let (ingress_producer, ingress_consumer) =
            rtrb::RingBuffer::new(config.buffers.ingest_queue_capacity);
        let (state_tx, state_rx) = watch::channel(CognitiveState::default());
        let (latest_tx, latest_rx) = watch::channel(None);
        let (events_tx, _) = broadcast::channel(100);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = EngineHandle {
            state_rx,
            latest_rx,
            events_tx: events_tx.clone(),
            session: session.clone(),
            shutdown_tx,
        };

        Ok(Self {
            apen: ApEnEstimator::from_config(&config.apen),
            classifier: ClassificationEngine::new(model),
            session,
            alpha_buffer: RollingBuffer::new(config.buffers.capacity),
            beta_buffer: RollingBuffer::new(config.buffers.capacity),
            theta_buffer: RollingBuffer::new(config.buffers.capacity),
            baseline: BaselineTracker::new(Duration::from_secs(
                config.baseline.calibration_secs,
            )),
            aggregator: SegmentAggregator::new(config.segmenting.segment_secs),
            session_start: None,
            last_seen: None,
            pending_segment: None,
            ingress_consumer,
            ingress_producer: Some(ingress_producer),
            state_tx,
            latest_tx,
            events_tx,
            shutdown_rx,
            handle,
            config,
            source,
        })
    }

    /// Control/read handle for this engine
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Take the push-style ingress producer (single writer; available once)
    pub fn ingress(&mut self) -> Option<rtrb::Producer<Sample>> {
        self.ingress_producer.take()
    }

    /// Feed one sample through buffers, baseline and the aggregator
    ///
    /// Out-of-order samples are rejected with prior state intact.
    pub fn ingest(&mut self, sample: &Sample) -> Result<(), PipelineError> {
        let start = *self.session_start.get_or_insert(sample.timestamp);
        let elapsed = (sample.timestamp - start).to_std().unwrap_or_default();

        // The aggregator enforces monotonicity; probe it first so a
        // rejected sample touches nothing else
        let finalized = self.aggregator.observe(sample)?;
        if let Some(segment) = finalized {
            debug!(
                "[Engine] segment {} finalized ({} samples)",
                segment.index, segment.sample_count
            );
            self.pending_segment = Some(segment);
        }

        self.baseline.observe(sample, elapsed);
        self.alpha_buffer.push(sample.alpha);
        self.beta_buffer.push(sample.beta);
        self.theta_buffer.push(sample.theta);
        self.last_seen = Some(sample.timestamp);
        Ok(())
    }

    /// Attempt one classification over the most recent finalized segment
    ///
    /// Returns `Ok(None)` when no segment has completed since the last
    /// call. Tick-local errors (baseline not ready, zero baseline, missing
    /// feature) are surfaced to the caller, which logs and skips.
    pub fn evaluate_tick(&mut self) -> Result<Option<ClassificationEvent>, PipelineError> {
        let segment = match self.pending_segment.take() {
            Some(segment) => segment,
            None => return Ok(None),
        };

        let baseline_alpha = self.baseline.value(Band::Alpha)?;
        let ci_alpha = cognitive_index(baseline_alpha, segment.mean_alpha)?;

        let features = FeatureVector {
            ci_alpha,
            alpha_apen: self.feature_apen(segment.mean_apen_alpha, &self.alpha_buffer),
            beta_apen: self.feature_apen(segment.mean_apen_beta, &self.beta_buffer),
            theta_apen: self.feature_apen(segment.mean_apen_theta, &self.theta_buffer),
        };

        let recent_alpha = self.alpha_buffer.snapshot();
        let event = self
            .classifier
            .classify(segment.end, &features, &recent_alpha)?;
        Ok(Some(event))
    }

    /// Segment-mean ApEn when the upstream supplied it, else a local
    /// estimate over the rolling buffer once it holds enough points
    fn feature_apen(&self, precomputed: Option<f64>, buffer: &RollingBuffer) -> Option<f64> {
        if precomputed.is_some() {
            return precomputed;
        }
        if buffer.len() < self.config.apen.min_samples {
            return None;
        }
        self.apen.estimate(&buffer.snapshot()).ok()
    }

    /// Publish an event to subscribers and, if recording, to the log
    fn publish(&mut self, event: ClassificationEvent) -> Result<(), RecordingError> {
        let persisted = self.session.record(&event)?;
        debug!(
            "[Engine] event ci_alpha={:.2} label={:?} confidence={:.2} persisted={}",
            event.ci_alpha, event.label, event.confidence, persisted
        );

        let state = CognitiveState {
            load: match event.label {
                crate::analysis::LoadLabel::Low => LoadState::Low,
                crate::analysis::LoadLabel::High => LoadState::High,
            },
            confidence: event.confidence,
            last_update: Some(event.timestamp),
        };
        let _ = self.state_tx.send(state);
        let _ = self.latest_tx.send(Some(event.clone()));
        let _ = self.events_tx.send(event);
        Ok(())
    }

    /// Mark the tick as unclassifiable; the visible state degrades to
    /// Unknown rather than showing a stale or incorrect label
    fn degrade(&self) {
        // Drop the read guard before sending on the same channel
        let last_update = self.state_tx.borrow().last_update;
        let _ = self.state_tx.send(CognitiveState {
            load: LoadState::Unknown,
            confidence: 0.0,
            last_update,
        });
    }

    /// Drain push-style ingress, then pull recent readings from the source
    async fn collect_samples(&mut self) -> Result<Vec<Sample>, PipelineError> {
        let mut samples = Vec::new();
        while let Ok(sample) = self.ingress_consumer.pop() {
            samples.push(sample);
        }

        let fetched = fetch_with_timeout(
            self.source.as_ref(),
            self.config.evaluator.fetch_limit,
            Duration::from_millis(self.config.evaluator.fetch_timeout_ms),
        )
        .await?;
        samples.extend(fetched);
        Ok(samples)
    }

    /// One full evaluator tick: collect, ingest, classify, publish
    async fn run_tick(&mut self) -> Result<(), RecordingError> {
        let samples = match self.collect_samples().await {
            Ok(samples) => samples,
            Err(err) => {
                // Timeout or transient source failure: skip, retry next tick
                log_pipeline_error(&err, "collect_samples");
                return Ok(());
            }
        };

        for sample in &samples {
            // Overlapping poll windows redeliver readings; only genuinely
            // new timestamps enter the pipeline
            if let Some(last) = self.last_seen {
                if sample.timestamp <= last {
                    continue;
                }
            }
            if let Err(err) = self.ingest(sample) {
                warn!("[Engine] sample rejected: {}", err);
            }
        }

        match self.evaluate_tick() {
            Ok(Some(event)) => self.publish(event)?,
            Ok(None) => debug!("[Engine] no completed segment this tick"),
            Err(err) => {
                log_pipeline_error(&err, "evaluate_tick");
                self.degrade();
            }
        }
        Ok(())
    }

    /// Run the periodic evaluator until shutdown
    ///
    /// Tick-local errors never abort the loop; the only fatal error is a
    /// recording failure (log lock retry budget exhausted or I/O loss).
    pub async fn run(mut self) -> Result<(), RecordingError> {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.evaluator.interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut shutdown_rx = self.shutdown_rx.clone();

        info!(
            "[Engine] evaluator running, interval {} ms",
            self.config.evaluator.interval_ms
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.run_tick().await?;
                }
            }
        }

        // Finalize the trailing partial segment so a short session still
        // yields its last decision
        if let Some(segment) = self.aggregator.flush() {
            if !self.baseline.is_frozen() {
                if let Err(err) = self.baseline.freeze_now() {
                    log_pipeline_error(&err, "final_freeze");
                }
            }
            self.pending_segment = Some(segment);
            match self.evaluate_tick() {
                Ok(Some(event)) => self.publish(event)?,
                Ok(None) => {}
                Err(err) => log_pipeline_error(&err, "final_tick"),
            }
        }

        info!("[Engine] evaluator stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ThresholdModel;
    use crate::ingest::mock::{MockHeadband, MockProfile};
    use chrono::Duration as ChronoDuration;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_log_path(tag: &str) -> PathBuf {
        let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "cogload_engine_{}_{}_{}.csv",
            tag,
            std::process::id(),
            unique
        ))
    }

    fn test_engine(tag: &str) -> (PipelineEngine, PathBuf) {
        let path = temp_log_path(tag);
        let mut config = AppConfig::default();
        config.recording.log_path = path.to_string_lossy().into_owned();
        // Short calibration so tests freeze quickly
        config.baseline.calibration_secs = 6;

        let engine = PipelineEngine::new(
            config,
            Arc::new(MockHeadband::new(MockProfile::Calm)),
            Arc::new(ThresholdModel {
                ci_alpha_threshold: 10.0,
            }),
        )
        .unwrap();
        (engine, path)
    }

    fn sample_at(base: DateTime<Utc>, secs: f64, alpha: f64) -> Sample {
        Sample {
            timestamp: base + ChronoDuration::milliseconds((secs * 1000.0) as i64),
            alpha,
            beta: 20.0,
            theta: 15.0,
            delta: 0.0,
            gamma: 0.0,
            alpha_apen: Some(0.3),
            beta_apen: Some(0.25),
            theta_apen: Some(0.35),
        }
    }

    #[test]
    fn test_no_event_before_any_segment_completes() {
        let (mut engine, path) = test_engine("nosegment");
        let base = Utc::now();
        engine.ingest(&sample_at(base, 0.0, 40.0)).unwrap();
        engine.ingest(&sample_at(base, 1.0, 41.0)).unwrap();

        assert!(engine.evaluate_tick().unwrap().is_none());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_not_ready_before_baseline_freeze() {
        let (mut engine, path) = test_engine("notready");
        let base = Utc::now();
        engine.ingest(&sample_at(base, 0.0, 40.0)).unwrap();
        // Advances the segment index (3s segments) but stays inside the 6s
        // calibration window
        engine.ingest(&sample_at(base, 3.5, 42.0)).unwrap();

        match engine.evaluate_tick() {
            Err(PipelineError::NotReady) => {}
            other => panic!("Expected NotReady, got {:?}", other),
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_classification_after_baseline_freeze() {
        let (mut engine, path) = test_engine("classify");
        let base = Utc::now();
        // Calibration interval: mean alpha 40
        engine.ingest(&sample_at(base, 0.0, 40.0)).unwrap();
        engine.ingest(&sample_at(base, 2.0, 40.0)).unwrap();
        // Crossing 6s freezes the baseline and finalizes segment 0
        engine.ingest(&sample_at(base, 6.5, 30.0)).unwrap();
        engine.evaluate_tick().unwrap();

        // Suppressed alpha in segment 2: CI = (40-30)/40*100 = 25 > 10
        engine.ingest(&sample_at(base, 9.5, 30.0)).unwrap();
        let event = engine
            .evaluate_tick()
            .unwrap()
            .expect("segment 2 should classify");
        assert_eq!(event.prediction, 1);
        assert_eq!(event.ci_alpha, 25.0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_out_of_order_sample_rejected_by_ingest() {
        let (mut engine, path) = test_engine("ooo");
        let base = Utc::now();
        engine.ingest(&sample_at(base, 2.0, 40.0)).unwrap();

        match engine.ingest(&sample_at(base, 1.0, 40.0)) {
            Err(PipelineError::OutOfOrderSample { .. }) => {}
            other => panic!("Expected OutOfOrderSample, got {:?}", other),
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_handle_state_degrades_to_unknown_on_skip() {
        let (mut engine, path) = test_engine("degrade");
        let handle = engine.handle();
        assert_eq!(handle.cognitive_state().load, LoadState::Unknown);

        let base = Utc::now();
        engine.ingest(&sample_at(base, 0.0, 40.0)).unwrap();
        engine.ingest(&sample_at(base, 3.5, 40.0)).unwrap();
        // NotReady: baseline still open
        let _ = engine.evaluate_tick();
        engine.degrade();

        let state = handle.cognitive_state();
        assert_eq!(state.load, LoadState::Unknown);
        assert_eq!(state.confidence, 0.0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_ingress_producer_taken_once() {
        let (mut engine, path) = test_engine("ingress");
        assert!(engine.ingress().is_some());
        assert!(engine.ingress().is_none());
        std::fs::remove_file(&path).ok();
    }
}
