// SegmentAggregator - fixed-duration epoch bucketing
//
// Incoming samples are mapped to segment_index =
// floor(seconds_since_session_start / segment_length) and reduced to
// per-segment band-power means (plus mean pre-computed ApEn where the
// upstream supplied it). A segment is finalized the moment a sample with a
// strictly larger index arrives; samples must be delivered in
// non-decreasing timestamp order and a regression is rejected with
// OutOfOrderSample, keeping prior state intact.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::warn;

use crate::error::PipelineError;
use crate::ingest::Sample;

/// A finalized fixed-duration segment
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub index: u64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub mean_alpha: f64,
    pub mean_beta: f64,
    pub mean_theta: f64,
    pub mean_apen_alpha: Option<f64>,
    pub mean_apen_beta: Option<f64>,
    pub mean_apen_theta: Option<f64>,
    /// Number of samples reduced into this segment
    pub sample_count: u64,
}

/// Sum + count accumulator for one open segment
#[derive(Debug, Clone, Default)]
struct SegmentAccumulator {
    count: u64,
    sum_alpha: f64,
    sum_beta: f64,
    sum_theta: f64,
    apen_alpha: ApEnSum,
    apen_beta: ApEnSum,
    apen_theta: ApEnSum,
}

/// Optional-feature accumulator: mean over the samples that carried a value
#[derive(Debug, Clone, Copy, Default)]
struct ApEnSum {
    sum: f64,
    count: u64,
}

impl ApEnSum {
    fn observe(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

impl SegmentAccumulator {
    fn observe(&mut self, sample: &Sample) {
        self.count += 1;
        self.sum_alpha += sample.alpha;
        self.sum_beta += sample.beta;
        self.sum_theta += sample.theta;
        self.apen_alpha.observe(sample.alpha_apen);
        self.apen_beta.observe(sample.beta_apen);
        self.apen_theta.observe(sample.theta_apen);
    }

    fn finalize(&self, index: u64, start: DateTime<Utc>, end: DateTime<Utc>) -> Segment {
        let n = self.count as f64;
        Segment {
            index,
            start,
            end,
            mean_alpha: self.sum_alpha / n,
            mean_beta: self.sum_beta / n,
            mean_theta: self.sum_theta / n,
            mean_apen_alpha: self.apen_alpha.mean(),
            mean_apen_beta: self.apen_beta.mean(),
            mean_apen_theta: self.apen_theta.mean(),
            sample_count: self.count,
        }
    }
}

/// Buckets a monotonic sample stream into fixed-length segments
#[derive(Debug, Clone)]
pub struct SegmentAggregator {
    segment_secs: f64,
    session_start: Option<DateTime<Utc>>,
    last_timestamp: Option<DateTime<Utc>>,
    open: Option<(u64, SegmentAccumulator)>,
}

impl SegmentAggregator {
    pub fn new(segment_secs: f64) -> Self {
        assert!(segment_secs > 0.0, "segment length must be positive");
        Self {
            segment_secs,
            session_start: None,
            last_timestamp: None,
            open: None,
        }
    }

    /// Deliver the next sample in time order
    ///
    /// Returns the previously open segment when this sample advances the
    /// segment index, `None` otherwise. The first sample of a session
    /// defines the session start.
    pub fn observe(&mut self, sample: &Sample) -> Result<Option<Segment>, PipelineError> {
        if let Some(last) = self.last_timestamp {
            if sample.timestamp < last {
                warn!(
                    "[Segment] timestamp regression: {} after {}",
                    sample.timestamp, last
                );
                return Err(PipelineError::OutOfOrderSample {
                    details: format!("{} arrived after {}", sample.timestamp, last),
                });
            }
        }

        let start = *self.session_start.get_or_insert(sample.timestamp);
        self.last_timestamp = Some(sample.timestamp);

        let elapsed = (sample.timestamp - start)
            .to_std()
            .unwrap_or_default()
            .as_secs_f64();
        let index = (elapsed / self.segment_secs).floor() as u64;

        let finalized = match self.open.take() {
            Some((open_index, accumulator)) if open_index < index => {
                Some(self.finalize(open_index, &accumulator))
            }
            Some(open) => {
                self.open = Some(open);
                None
            }
            None => None,
        };

        let (_, accumulator) = self
            .open
            .get_or_insert_with(|| (index, SegmentAccumulator::default()));
        accumulator.observe(sample);

        Ok(finalized)
    }

    /// Finalize the trailing open segment, e.g. at session end
    pub fn flush(&mut self) -> Option<Segment> {
        let (index, accumulator) = self.open.take()?;
        Some(self.finalize(index, &accumulator))
    }

    fn finalize(&self, index: u64, accumulator: &SegmentAccumulator) -> Segment {
        // Session start is set before any segment can be finalized
        let session_start = self.session_start.unwrap_or_else(Utc::now);
        let micros_per_segment = (self.segment_secs * 1_000_000.0) as i64;
        let start = session_start + ChronoDuration::microseconds(index as i64 * micros_per_segment);
        let end = start + ChronoDuration::microseconds(micros_per_segment);
        accumulator.finalize(index, start, end)
    }
}
