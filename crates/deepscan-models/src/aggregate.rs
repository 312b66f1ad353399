//! Majority-vote aggregation of frame verdicts.

use thiserror::Error;

use crate::verdict::{AggregateVerdict, FrameVerdict};

pub type AggregateResult<T> = Result<T, AggregateError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("Cannot aggregate an empty set of verdicts")]
    Empty,
}

/// Combine frame verdicts into one.
///
/// Confidence is the unweighted mean. The result is flagged only when
/// strictly more than half of the inputs are flagged, so ties resolve to
/// not flagged.
pub fn aggregate(verdicts: &[FrameVerdict]) -> AggregateResult<AggregateVerdict> {
    if verdicts.is_empty() {
        return Err(AggregateError::Empty);
    }

    let total = verdicts.len();
    let confidence = verdicts.iter().map(|v| v.confidence).sum::<f64>() / total as f64;
    let flagged = verdicts.iter().filter(|v| v.is_flagged).count();

    Ok(AggregateVerdict {
        confidence,
        is_flagged: flagged * 2 > total,
        frame_count: total,
        message: format!(
            "Average deepfake confidence is {:.2}% based on {} frames.",
            confidence, total
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdicts(scores: &[(f64, bool)]) -> Vec<FrameVerdict> {
        scores
            .iter()
            .map(|&(confidence, flagged)| FrameVerdict::new(confidence, flagged))
            .collect()
    }

    #[test]
    fn test_empty_is_error() {
        assert_eq!(aggregate(&[]), Err(AggregateError::Empty));
    }

    #[test]
    fn test_single_verdict() {
        let result = aggregate(&verdicts(&[(72.5, true)])).unwrap();
        assert_eq!(result.frame_count, 1);
        assert!((result.confidence - 72.5).abs() < 1e-9);
        assert!(result.is_flagged);

        let result = aggregate(&verdicts(&[(10.0, false)])).unwrap();
        assert!(!result.is_flagged);
    }

    #[test]
    fn test_strict_majority() {
        let three_of_five = verdicts(&[
            (90.0, true),
            (80.0, true),
            (70.0, true),
            (20.0, false),
            (10.0, false),
        ]);
        assert!(aggregate(&three_of_five).unwrap().is_flagged);

        let two_of_four = verdicts(&[(90.0, true), (80.0, true), (20.0, false), (10.0, false)]);
        assert!(!aggregate(&two_of_four).unwrap().is_flagged);
    }

    #[test]
    fn test_mean_ignores_order() {
        let forward = verdicts(&[(10.0, false), (55.0, true), (99.0, true)]);
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = aggregate(&forward).unwrap();
        let b = aggregate(&reversed).unwrap();
        assert!((a.confidence - 54.666_666_666).abs() < 1e-6);
        assert!((a.confidence - b.confidence).abs() < 1e-9);
        assert_eq!(a.is_flagged, b.is_flagged);
    }

    #[test]
    fn test_message_mentions_frames() {
        let result = aggregate(&verdicts(&[(40.0, false), (60.0, true)])).unwrap();
        assert_eq!(
            result.message,
            "Average deepfake confidence is 50.00% based on 2 frames."
        );
    }
}
