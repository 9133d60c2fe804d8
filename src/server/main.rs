use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use licensedesk::config::init_config;
use licensedesk::errors::{DeskError, DeskResult};
use licensedesk::server::logging::env_filter;
use licensedesk::server::shutdown::wait_for_shutdown;
use licensedesk::server::{build_router, AppState, Database};

#[tokio::main]
async fn main() -> DeskResult<()> {
    let config = init_config()?;

    tracing_subscriber::registry()
        .with(env_filter(&config.logging))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = Database::new().await?;
    info!("Connected to {} database", db.db_type());

    let app = build_router(AppState { db });

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DeskError::ServerError(format!("failed to bind {addr}: {e}")))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(tokio::signal::ctrl_c()))
        .await
        .map_err(|e| DeskError::ServerError(e.to_string()))?;

    Ok(())
}
