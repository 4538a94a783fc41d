//! # TaskHive API Server
//!
//! This is the main API server for TaskHive, providing account lifecycle
//! endpoints (sign-up, activation, sign-in, password reset) and JWT-guarded
//! task CRUD.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskhive-api
//! ```

use std::sync::Arc;

use taskhive_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskhive_shared::{
    auth::service::AuthService,
    db::{
        credentials::PgCredentialStore,
        migrations::{ensure_database_exists, run_migrations},
        pool::{create_pool, DatabaseConfig},
    },
    mail::TracingMailer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskhive_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TaskHive API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    ensure_database_exists(&config.database.url).await?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..DatabaseConfig::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let auth = AuthService::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        config.jwt_config(),
    );

    let state = AppState::new(pool, auth, Arc::new(TracingMailer), config.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Server listening on http://{}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves when ctrl-c is received
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
