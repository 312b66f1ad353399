//! Axum HTTP API server.
//!
//! This crate provides:
//! - `POST /analyze` for single images and videos
//! - Frame sampling and concurrent per-frame scoring for videos
//! - Health, readiness and Prometheus metrics endpoints
//! - Per-IP rate limiting and security headers

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{Analysis, MediaAnalyzer};
pub use state::AppState;
