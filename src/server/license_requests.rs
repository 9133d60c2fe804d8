//! License request operations.
//!
//! These functions hold the request semantics and know nothing about HTTP;
//! the axum handlers in `handlers` validate input, call into here, and map
//! errors to responses.

use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{DeskError, DeskResult};
use crate::server::database::{Database, Record};
use crate::server::logging::{log_request_event, RequestEvent};
use crate::status::ApprovalStatus;

/// Result of creating a license request.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedLicenseRequest {
    /// The user row for the national id, if one exists
    pub user: Option<Record>,
    /// The license row for the license id, if one exists
    pub license: Option<Record>,
    /// Id of the inserted request
    pub license_request: i64,
}

/// Result of a status update.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub request_id: i64,
    pub status: ApprovalStatus,
    /// Whether a row was written
    pub update_result: bool,
    pub expire_time: Option<NaiveDateTime>,
}

/// Current time at second precision, matching the stored timestamp layout.
fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(0)
}

/// Look up the user and license, then insert a pending request.
///
/// No referential check is made: the request is created even when the
/// user or license does not exist.
pub async fn create_license_request(
    db: &Database,
    national_id: &str,
    license_id: &str,
) -> DeskResult<CreatedLicenseRequest> {
    let user = db.find_user(national_id).await?;
    let license = db.find_license(license_id).await?;

    if user.is_none() {
        warn!("No user found for national_id={}", national_id);
    }
    if license.is_none() {
        warn!("No license found for license_id={}", license_id);
    }

    let request_id = db.insert_license_request(national_id, license_id).await?;

    log_request_event(
        RequestEvent::Created,
        request_id,
        Some(&format!("national_id={national_id} license_id={license_id}")),
    );

    Ok(CreatedLicenseRequest {
        user,
        license,
        license_request: request_id,
    })
}

/// Compute the expiration for approving `request_id`.
///
/// Fails with `NotFound` when the request or its license is missing and
/// with `InvalidValidityUnit`/`InvalidValidityPeriod` when the license's
/// validity cannot be applied.
async fn approval_expiration(
    db: &Database,
    request_id: i64,
    from: NaiveDateTime,
) -> DeskResult<NaiveDateTime> {
    let license_id = db.license_for_request(request_id).await?.ok_or_else(|| {
        DeskError::NotFound(format!("License request not found for ID: {request_id}"))
    })?;

    let validity = db.license_validity(&license_id).await?.ok_or_else(|| {
        DeskError::NotFound(format!("License not found for license ID: {license_id}"))
    })?;

    let period = validity.period()?;
    let expires = period.expiration_from(from)?;

    info!(
        "License {} valid for {}, request {} expires at {}",
        license_id, period, request_id, expires
    );

    Ok(expires)
}

/// Apply a target status to a license request.
///
/// Rejection clears the expiration without looking the request up.
/// Approval resolves the request's license and sets the expiration to now
/// plus the license's validity period. Nothing is written if any lookup
/// or computation fails.
pub async fn update_license_request_status(
    db: &Database,
    request_id: i64,
    status: ApprovalStatus,
) -> DeskResult<StatusUpdate> {
    let (expire_time, event) = match status {
        ApprovalStatus::Rejected => (None, RequestEvent::Rejected),
        ApprovalStatus::Approved => (
            Some(approval_expiration(db, request_id, now()).await?),
            RequestEvent::Approved,
        ),
        ApprovalStatus::Pending => {
            return Err(DeskError::InvalidStatus(status.to_string()));
        }
    };

    let updated = db
        .update_license_request_status(request_id, status, expire_time)
        .await?;

    if updated {
        log_request_event(event, request_id, None);
    } else {
        warn!("Status update matched no license request for id={}", request_id);
    }

    Ok(StatusUpdate {
        request_id,
        status,
        update_result: updated,
        expire_time,
    })
}
