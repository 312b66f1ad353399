//! Detection client configuration.

use std::fmt;
use std::time::Duration;

use deepscan_models::DecisionThreshold;

use crate::error::{DetectorError, DetectorResult};

pub const DEFAULT_ENDPOINT: &str = "https://api.sightengine.com/1.0/check.json";
pub const DEFAULT_MODELS: &str = "deepfake";

pub const API_USER_VAR: &str = "SIGHTENGINE_API_USER";
pub const API_SECRET_VAR: &str = "SIGHTENGINE_API_SECRET";

/// Credential pair sent with every scoring request.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub api_user: String,
    pub api_secret: String,
}

impl ApiCredentials {
    pub fn new(api_user: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_user: api_user.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_user", &self.api_user)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Configuration for the detection client.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Scoring endpoint URL
    pub endpoint: String,
    /// Value of the `models` form field
    pub models: String,
    /// API credentials
    pub credentials: ApiCredentials,
    /// Per-call timeout
    pub timeout: Duration,
    /// Confidence cutoff for flagging
    pub threshold: DecisionThreshold,
    /// Max concurrent requests to the scoring API
    pub max_in_flight: usize,
}

impl DetectorConfig {
    /// Config with default settings for the given credentials.
    pub fn new(credentials: ApiCredentials) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            models: DEFAULT_MODELS.to_string(),
            credentials,
            timeout: Duration::from_secs(30),
            threshold: DecisionThreshold::default(),
            max_in_flight: 8,
        }
    }

    /// Create config from environment variables.
    ///
    /// Both credentials are required. A missing or blank value is an error.
    pub fn from_env() -> DetectorResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> DetectorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(DetectorError::MissingCredential(key))
        };

        let credentials = ApiCredentials::new(required(API_USER_VAR)?, required(API_SECRET_VAR)?);
        let mut config = Self::new(credentials);

        if let Some(endpoint) = lookup("SIGHTENGINE_ENDPOINT").filter(|v| !v.trim().is_empty()) {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(DetectorError::InvalidConfig(format!(
                    "SIGHTENGINE_ENDPOINT must be an http(s) URL, got {endpoint}"
                )));
            }
            config.endpoint = endpoint;
        }
        if let Some(models) = lookup("SIGHTENGINE_MODELS").filter(|v| !v.trim().is_empty()) {
            config.models = models;
        }
        if let Some(secs) = lookup("DETECTOR_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(threshold) = lookup("DETECTION_THRESHOLD").and_then(|s| s.parse().ok()) {
            config.threshold = DecisionThreshold::new(threshold);
        }
        if let Some(n) = lookup("DETECTOR_MAX_IN_FLIGHT")
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0)
        {
            config.max_in_flight = n;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DetectorConfig::from_lookup(lookup(&[
            (API_USER_VAR, "1234"),
            (API_SECRET_VAR, "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.models, "deepfake");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.threshold, DecisionThreshold::DEFAULT);
        assert_eq!(config.credentials.api_user, "1234");
    }

    #[test]
    fn test_missing_credentials() {
        let err = DetectorConfig::from_lookup(lookup(&[(API_SECRET_VAR, "s3cret")])).unwrap_err();
        assert!(matches!(err, DetectorError::MissingCredential(API_USER_VAR)));

        let err = DetectorConfig::from_lookup(lookup(&[(API_USER_VAR, "1234"), (API_SECRET_VAR, "  ")]))
            .unwrap_err();
        assert!(matches!(err, DetectorError::MissingCredential(API_SECRET_VAR)));
        assert_eq!(err.to_string(), "SIGHTENGINE_API_SECRET is not set");
    }

    #[test]
    fn test_overrides() {
        let config = DetectorConfig::from_lookup(lookup(&[
            (API_USER_VAR, "1234"),
            (API_SECRET_VAR, "s3cret"),
            ("SIGHTENGINE_ENDPOINT", "http://localhost:9000/check.json"),
            ("DETECTOR_TIMEOUT_SECS", "5"),
            ("DETECTION_THRESHOLD", "70"),
            ("DETECTOR_MAX_IN_FLIGHT", "2"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, "http://localhost:9000/check.json");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.threshold.value(), 70.0);
        assert_eq!(config.max_in_flight, 2);
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = DetectorConfig::from_lookup(lookup(&[
            (API_USER_VAR, "1234"),
            (API_SECRET_VAR, "s3cret"),
            ("SIGHTENGINE_ENDPOINT", "ftp://example.com"),
        ]))
        .unwrap_err();
        assert!(matches!(err, DetectorError::InvalidConfig(_)));
    }

    #[test]
    fn test_secret_redacted_in_debug() {
        let debug = format!("{:?}", ApiCredentials::new("1234", "s3cret"));
        assert!(debug.contains("1234"));
        assert!(!debug.contains("s3cret"));
    }
}
