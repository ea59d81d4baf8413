// Cognitive index - baseline-relative load proxy
//
// CI = (baseline - current) / baseline * 100, a signed percentage. Alpha
// suppression under load makes the alpha CI rise. A zero baseline makes
// the index undefined; callers treat it as unavailable for the tick and
// skip classification rather than propagate NaN or Inf.

use crate::error::PipelineError;

/// Percentage deviation of current band power from the frozen baseline
pub fn cognitive_index(baseline: f64, current: f64) -> Result<f64, PipelineError> {
    if baseline == 0.0 {
        return Err(PipelineError::DivisionByZero);
    }
    Ok((baseline - current) / baseline * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppression_yields_positive_index() {
        assert_eq!(cognitive_index(50.0, 40.0).unwrap(), 20.0);
    }

    #[test]
    fn test_elevation_yields_negative_index() {
        assert_eq!(cognitive_index(50.0, 60.0).unwrap(), -20.0);
    }

    #[test]
    fn test_no_change_is_zero() {
        assert_eq!(cognitive_index(50.0, 50.0).unwrap(), 0.0);
    }

    #[test]
    fn test_zero_baseline_fails() {
        match cognitive_index(0.0, 42.0) {
            Err(PipelineError::DivisionByZero) => {}
            other => panic!("Expected DivisionByZero, got {:?}", other),
        }
    }
}
