//! Client for the third-party deepfake scoring API.
//!
//! Images are posted to Sightengine's `check.json` endpoint with the
//! `deepfake` model. The nested score in the response is normalized into a
//! [`FrameVerdict`](deepscan_models::FrameVerdict).

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{DetectionClient, ImageScorer};
pub use config::{ApiCredentials, DetectorConfig};
pub use error::{DetectorError, DetectorResult};
