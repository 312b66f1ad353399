//! Scoring API response types.

use serde::Deserialize;
use serde_json::Value;

/// Successful `check.json` response. Only the fields we read are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "type", default)]
    pub scores: Option<TypeScores>,
}

/// Scores returned under the `type` key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeScores {
    /// Probability in [0, 1] that the image is a deepfake
    #[serde(default)]
    pub deepfake: Option<f64>,
}

impl CheckResponse {
    /// The API flagged the request itself as failed.
    pub fn is_failure(&self) -> bool {
        self.status.as_deref() == Some("failure")
    }

    pub fn deepfake_score(&self) -> Option<f64> {
        self.scores.as_ref().and_then(|s| s.deepfake)
    }
}

/// Pull a human-readable message out of an error body.
///
/// The API reports `{"error": "..."}` or `{"error": {"message": "..."}}`.
/// Anything else falls back to the raw body text.
pub fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| match json.get("error")? {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        });

    match message {
        Some(m) => m,
        None if body.trim().is_empty() => "Unknown error from detection API".to_string(),
        None => body.to_string(),
    }
}
