// SampleSource - pull-style upstream interface
//
// The acquisition collaborator (headband driver, mock server, replay file)
// is consumed through this trait. The evaluator fetches the last K readings
// each tick under a bounded timeout; a source that stalls never stalls the
// pipeline.

use futures::future::BoxFuture;
use std::time::Duration;

use crate::error::PipelineError;
use crate::ingest::Sample;

/// Pull-style source of band-power readings
///
/// Implementations must return readings in non-decreasing timestamp order,
/// most recent last, and should bound their own work so that a fetch
/// completes well inside the evaluator's timeout.
pub trait SampleSource: Send + Sync {
    /// Fetch up to `limit` most recent readings
    fn fetch_recent(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Sample>, PipelineError>>;
}

/// Fetch with a bounded timeout
///
/// Wraps the source fetch in `tokio::time::timeout`. A timeout maps to
/// `PipelineError::UpstreamTimeout`, which the evaluator treats as a
/// tick-local skip, never a session failure.
pub async fn fetch_with_timeout(
    source: &dyn SampleSource,
    limit: usize,
    timeout: Duration,
) -> Result<Vec<Sample>, PipelineError> {
    match tokio::time::timeout(timeout, source.fetch_recent(limit)).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::UpstreamTimeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    /// Source that never completes, for timeout behavior
    struct StalledSource;

    impl SampleSource for StalledSource {
        fn fetch_recent(&self, _limit: usize) -> BoxFuture<'_, Result<Vec<Sample>, PipelineError>> {
            Box::pin(async {
                futures::future::pending::<()>().await;
                unreachable!()
            })
        }
    }

    /// Source that returns a fixed reading immediately
    struct OneShotSource;

    impl SampleSource for OneShotSource {
        fn fetch_recent(&self, _limit: usize) -> BoxFuture<'_, Result<Vec<Sample>, PipelineError>> {
            Box::pin(async {
                Ok(vec![Sample {
                    timestamp: Utc::now(),
                    alpha: 40.0,
                    beta: 20.0,
                    theta: 15.0,
                    delta: 0.0,
                    gamma: 0.0,
                    alpha_apen: None,
                    beta_apen: None,
                    theta_apen: None,
                }])
            })
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout_maps_to_upstream_timeout() {
        let source = StalledSource;
        let result = fetch_with_timeout(&source, 10, Duration::from_millis(20)).await;

        match result {
            Err(PipelineError::UpstreamTimeout { timeout_ms }) => assert_eq!(timeout_ms, 20),
            other => panic!("Expected UpstreamTimeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_within_timeout_passes_through() {
        let source = OneShotSource;
        let result = fetch_with_timeout(&source, 10, Duration::from_millis(500)).await;

        let samples = result.expect("fetch should succeed");
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].alpha, 40.0);
    }
}
