use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::server::api_error::{ApiError, ErrorCode};
use crate::server::database::Database;
use crate::server::extract::JsonBody;
use crate::server::license_requests::{
    create_license_request, update_license_request_status, CreatedLicenseRequest, StatusUpdate,
};
use crate::server::logging::HealthResponse;
use crate::server::validation::{require_request_id, require_status, require_text};
use crate::status::ApprovalStatus;

/// Shared application state for handlers.
///
/// Handlers receive the store handle from here rather than from a global.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

/// Body of a `POST` creating a license request.
///
/// Fields are optional at the type level so a missing field surfaces as a
/// 400 with our own message rather than a deserialization rejection.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CreateLicenseRequestBody {
    pub national_id: Option<String>,
    pub license_id: Option<String>,
}

/// Body of a `PUT`/`PATCH` updating a request's status.
///
/// `request_id` may be a JSON integer or a numeric string; `status` may be
/// a string or one of the integer tokens `1`/`0`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateLicenseRequestBody {
    pub request_id: Option<Value>,
    pub status: Option<Value>,
}

/// Handler for creating a license request.
///
/// Behavior:
/// - `national_id` and `license_id` are trimmed and must be non-empty (400).
/// - The user and license rows are looked up and echoed back (or null).
/// - A `pending` request is inserted and its id returned.
/// - DB errors bubble up as `ApiError` (HTTP 500).
pub async fn create_license_request_handler(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateLicenseRequestBody>,
) -> Result<Json<CreatedLicenseRequest>, ApiError> {
    let national_id = require_text(body.national_id.as_deref(), "national_id")?;
    let license_id = require_text(body.license_id.as_deref(), "license_id")?;

    info!(
        "Creating license request for national_id={} license_id={}",
        national_id, license_id
    );

    let created = create_license_request(&state.db, national_id, license_id).await?;

    Ok(Json(created))
}

/// Handler for updating a license request's approval status.
///
/// Behavior:
/// - `request_id` must be a positive integer and `status` non-empty (400).
/// - `status` must be `approved`/`1` or `rejected`/`0` (400 otherwise);
///   the digits may be sent as JSON integers.
/// - Approving a missing request or a request whose license is missing is 404.
/// - A license with an unusable validity period is 500.
pub async fn update_license_request_handler(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UpdateLicenseRequestBody>,
) -> Result<Json<StatusUpdate>, ApiError> {
    let request_id = require_request_id(body.request_id.as_ref(), "request_id")?;
    let raw_status = require_status(body.status.as_ref(), "status")?;
    let status = ApprovalStatus::parse_target(&raw_status)?;

    info!(
        "Updating license request id={} to status={}",
        request_id, status
    );

    let update = update_license_request_status(&state.db, request_id, status).await?;

    Ok(Json(update))
}

/// Fallback for every method the endpoint does not serve.
pub async fn method_not_allowed_handler() -> ApiError {
    ApiError::method_not_allowed()
}

/// Fallback for paths the service does not serve.
pub async fn not_found_handler() -> ApiError {
    ApiError::new(ErrorCode::NotFound)
}

/// Liveness and database connectivity.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = state.db.ping().await;
    Json(HealthResponse::healthy(connected, state.db.db_type()))
}
