//! Request logging middleware and structured lifecycle events.
//!
//! This module provides structured logging for all API requests including:
//! - Unique request ID tracking
//! - Request timing
//! - Method, path, and status logging
//! - Request ID propagation in response headers
//!
//! # Usage
//!
//! ```rust,ignore
//! use axum::middleware;
//! use licensedesk::server::logging::request_logging_middleware;
//!
//! let app = Router::new()
//!     .route("/", post(create_license_request_handler))
//!     .layer(middleware::from_fn(request_logging_middleware));
//! ```

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::LoggingConfig;

/// License request lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEvent {
    /// A pending request was inserted
    Created,
    /// A request was approved and given an expiration
    Approved,
    /// A request was rejected and its expiration cleared
    Rejected,
}

impl std::fmt::Display for RequestEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestEvent::Created => "created",
            RequestEvent::Approved => "approved",
            RequestEvent::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// Log a license request state change.
///
/// # Arguments
///
/// * `event` - The type of event
/// * `request_id` - The license request id
/// * `details` - Optional additional details about the event
pub fn log_request_event(event: RequestEvent, request_id: i64, details: Option<&str>) {
    let span = info_span!(
        "license_request_event",
        event = %event,
        request_id = request_id,
    );
    let _enter = span.enter();

    if let Some(d) = details {
        info!(details = %d, "License request event occurred");
    } else {
        info!("License request event occurred");
    }
}

/// Build the tracing filter for the configured level.
///
/// `RUST_LOG` takes precedence when set. Disabled logging maps to `off`.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let fallback = if config.enabled {
        config.level.to_lowercase()
    } else {
        "off".to_string()
    };

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Header name for the request ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Generate a new unique request ID.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Logging middleware that tracks request timing and generates request IDs.
///
/// This middleware:
/// 1. Generates a unique request ID for each incoming request
/// 2. Creates a tracing span with the request ID
/// 3. Logs the request method and path
/// 4. Measures and logs the response time
/// 5. Adds the request ID to the response headers
pub async fn request_logging_middleware(request: Request, next: Next) -> Response<Body> {
    let request_id = generate_request_id();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();

    let response = async move {
        info!("Started processing request");
        next.run(request).await
    }
    .instrument(span.clone())
    .await;

    let duration = start.elapsed();
    let status = response.status();

    let _enter = span.enter();
    info!(
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    let (mut parts, body) = response.into_parts();
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, header_value);
    }

    Response::from_parts(parts, body)
}

/// Health check response structure.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    /// Service status ("healthy" or "degraded")
    pub status: String,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Database connectivity status
    pub database: DatabaseHealth,
}

/// Database health status.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseHealth {
    /// Whether the database answered a probe query
    pub connected: bool,
    /// Database type (sqlite, postgres or mysql)
    pub db_type: String,
}

impl HealthResponse {
    pub fn healthy(db_connected: bool, db_type: &str) -> Self {
        Self {
            status: if db_connected { "healthy" } else { "degraded" }.to_string(),
            service: "licensedesk".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: DatabaseHealth {
                connected: db_connected,
                db_type: db_type.to_string(),
            },
        }
    }
}
