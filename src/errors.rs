//! Error types shared by the domain modules and the HTTP server.

/// Everything that can go wrong while handling a license request.
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    /// A required field is missing, empty, or malformed.
    #[error("{0}")]
    InvalidInput(String),

    /// The requested approval status is not one we accept.
    #[error("Invalid status value: {0}")]
    InvalidStatus(String),

    /// A referenced license request or license does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A license row carries a validity unit outside days/months/years.
    #[error("Invalid validaty unit: {0}")]
    InvalidValidityUnit(i32),

    /// A license row carries a validity duration we cannot apply.
    #[error("Invalid validaty period: {0}")]
    InvalidValidityPeriod(i32),

    /// The underlying data store failed.
    #[error("database error: {0}")]
    StorageError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("server error: {0}")]
    ServerError(String),
}

pub type DeskResult<T> = Result<T, DeskError>;
