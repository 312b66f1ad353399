//! Deepfake verdicts.
//!
//! A verdict pairs a 0-100 confidence that the media is synthetically
//! manipulated with a flagged / not-flagged decision.

use serde::{Deserialize, Serialize};

/// Confidence cutoff above which media is flagged.
///
/// The comparison is strict: a confidence equal to the threshold is not
/// flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionThreshold(f64);

impl DecisionThreshold {
    pub const DEFAULT: DecisionThreshold = DecisionThreshold(50.0);

    /// Create a threshold, clamped to the 0-100 confidence range.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::DEFAULT;
        }
        Self(value.clamp(0.0, 100.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_flagged(&self, confidence: f64) -> bool {
        confidence > self.0
    }
}

impl Default for DecisionThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Verdict for a single image or a single sampled frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameVerdict {
    /// Confidence in [0, 100]
    pub confidence: f64,
    /// Whether the confidence crossed the decision threshold
    pub is_flagged: bool,
}

impl FrameVerdict {
    pub fn new(confidence: f64, is_flagged: bool) -> Self {
        Self {
            confidence,
            is_flagged,
        }
    }

    /// Build a verdict from a raw 0-1 score.
    pub fn from_score(score: f64, threshold: DecisionThreshold) -> Self {
        let confidence = (score * 100.0).clamp(0.0, 100.0);
        Self::new(confidence, threshold.is_flagged(confidence))
    }

    pub fn message(&self) -> String {
        format!("Deepfake confidence is {:.2}%", self.confidence)
    }
}

/// Verdict combined from several frame verdicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateVerdict {
    /// Mean of the constituent confidences
    pub confidence: f64,
    /// True iff a strict majority of constituents were flagged
    pub is_flagged: bool,
    /// Number of frames that contributed
    pub frame_count: usize,
    /// Human-readable summary
    pub message: String,
}
