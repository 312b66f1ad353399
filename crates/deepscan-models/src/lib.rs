//! Shared data models for DeepScan backend.
//!
//! This crate provides Serde-serializable types for:
//! - Uploaded media and sampled video frames
//! - Per-frame and aggregate deepfake verdicts
//! - Majority-vote aggregation over frame verdicts

pub mod aggregate;
pub mod media;
pub mod verdict;

// Re-export common types
pub use aggregate::{aggregate, AggregateError, AggregateResult};
pub use media::{Frame, MediaKind, MediaUpload};
pub use verdict::{AggregateVerdict, DecisionThreshold, FrameVerdict};

/// Format a byte count as a human-readable megabyte string (e.g. "10MB").
pub fn format_megabytes(bytes: usize) -> String {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    if mb.fract() == 0.0 {
        format!("{}MB", mb as u64)
    } else {
        format!("{:.1}MB", mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(10 * 1024 * 1024), "10MB");
        assert_eq!(format_megabytes(20 * 1024 * 1024), "20MB");
        assert_eq!(format_megabytes(1536 * 1024), "1.5MB");
    }
}
