//! Request body extraction.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::server::api_error::{ApiError, ErrorCode};

/// JSON body extractor that ignores the `Content-Type` header.
///
/// Clients of the license request endpoint do not always label their
/// bodies, so the raw bytes are parsed as JSON whatever the header says.
/// Unreadable or malformed bodies are rejected with a 400 `ApiError`.
///
/// ```rust,ignore
/// async fn handler(JsonBody(body): JsonBody<CreateLicenseRequestBody>) { .. }
/// ```
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            warn!("Failed to read request body: {}", rejection.body_text());
            ApiError::with_message(ErrorCode::InvalidRequest, rejection.body_text())
        })?;

        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(JsonBody(value))
    }
}
