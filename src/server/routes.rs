use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::handlers::{
    create_license_request_handler, health_handler, method_not_allowed_handler,
    not_found_handler, update_license_request_handler, AppState,
};
use crate::server::logging::request_logging_middleware;

/// Path of the license request endpoint.
pub const LICENSE_REQUESTS_PATH: &str = "/";

/// Build the application router.
///
/// # Routes
///
/// - `POST /` - Create a pending license request
/// - `PUT /`, `PATCH /` - Approve or reject a license request
/// - any other method on `/` - 405 `{"error": "Method not allowed"}`
/// - `GET /health` - Service and database health (other methods 405)
/// - any other path - 404 `{"error": ...}`
///
/// Every response passes through the request logging middleware and
/// carries an `X-Request-Id` header.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            LICENSE_REQUESTS_PATH,
            post(create_license_request_handler)
                .put(update_license_request_handler)
                .patch(update_license_request_handler)
                .fallback(method_not_allowed_handler),
        )
        .route(
            "/health",
            get(health_handler).fallback(method_not_allowed_handler),
        )
        .fallback(not_found_handler)
        .layer(middleware::from_fn(request_logging_middleware))
        .with_state(state)
}
