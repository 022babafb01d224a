// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use relational_authz_server::{
    api::router,
    auth::AuthError,
    config::{AppConfig, ConfigError},
    logging,
    state::{bootstrap_admin, AppState},
    storage::{self, StoreError},
};
use thiserror::Error;

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] AuthError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    logging::init(config.server.log_format);

    let db = storage::open_in(&config.server.data_dir)?;
    tracing::info!(data_dir = %config.server.data_dir.display(), "Identity database opened");

    if let Some(admin) = bootstrap_admin(&db, config.server.bootstrap_admin.as_ref())? {
        tracing::info!(user_id = admin.id, "Bootstrap superuser ready");
    }

    let host = config.server.host.clone();
    let port = config.server.port;
    let app = router(AppState::new(config, db));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "Relational Authz listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
