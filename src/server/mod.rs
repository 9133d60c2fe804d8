// src/server/mod.rs

//! Server-side components for licensedesk.
//!
//! This module contains:
//! - `database`         → typed queries over SQLite/Postgres/MySQL pools
//! - `license_requests` → create and status-update operations
//! - `handlers`         → Axum HTTP handlers and shared state
//! - `extract`          → JSON body extractor
//! - `routes`           → Router builder
//! - `api_error`        → JSON error envelope and status mapping
//! - `logging`          → Request logging middleware and lifecycle events
//! - `shutdown`         → Graceful shutdown trigger
//! - `validation`       → Request validation utilities

pub mod api_error;
pub mod database;
pub mod extract;
pub mod handlers;
pub mod license_requests;
pub mod logging;
pub mod routes;
pub mod shutdown;
pub mod validation;

pub use api_error::{ApiError, ErrorCode};
pub use database::{Database, LicenseRequestRecord, LicenseValidity, Record};
pub use extract::JsonBody;
pub use handlers::{
    create_license_request_handler, health_handler, method_not_allowed_handler,
    not_found_handler, update_license_request_handler, AppState, CreateLicenseRequestBody,
    UpdateLicenseRequestBody,
};
pub use license_requests::{
    create_license_request, update_license_request_status, CreatedLicenseRequest, StatusUpdate,
};
pub use routes::build_router;
pub use validation::{
    require_request_id, require_status, require_text, validate_not_empty, ValidationError,
    ValidationResult,
};
