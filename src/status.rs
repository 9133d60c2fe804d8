//! Approval status of a license request.
//!
//! Requests are created `pending` and move to `approved` or `rejected`
//! through an explicit status update. The persisted tokens are always the
//! lowercase words; for update requests the numeric tokens `1` (approve) and
//! `0` (reject) are also accepted, case-insensitively and ignoring
//! surrounding whitespace.

use std::fmt;

use serde::Serialize;

use crate::errors::DeskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    /// Token written to `licenserequests.approval_status`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    /// Parse the target of a status update.
    ///
    /// Only terminal states are valid targets; `pending` and anything
    /// unrecognised yield `InvalidStatus`.
    pub fn parse_target(value: &str) -> Result<Self, DeskError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" | "1" => Ok(ApprovalStatus::Approved),
            "rejected" | "0" => Ok(ApprovalStatus::Rejected),
            _ => Err(DeskError::InvalidStatus(value.to_string())),
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
