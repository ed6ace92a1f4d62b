//! # Gello API Server
//!
//! Serves the Gello HTTP API in front of the hosted Postgres database and
//! auth service.
//!
//! ## Usage
//!
//! ```bash
//! GELLO__DATABASE__URL=postgresql://... \
//! GELLO__SUPABASE__URL=https://xyz.supabase.co \
//! cargo run -p gello-api
//! ```
//!
//! See `gello_api::config` for every setting.

use std::sync::Arc;

use gello_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
};
use gello_shared::{
    auth::supabase::SupabaseAuth,
    db::{
        pool::{close_pool, create_pool, DatabaseConfig},
        postgres::PgStore,
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "gello_api=debug,gello_shared=info,tower_http=debug";

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(config.log.format);

    tracing::info!("Gello API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        connect_timeout_seconds: config.database.connect_timeout_seconds,
        ..Default::default()
    })
    .await?;

    let auth = SupabaseAuth::new(
        &config.supabase.url,
        &config.supabase.anon_key,
        &config.supabase.service_role_key,
    )?;

    let bind_address = config.bind_address();
    let state = AppState::new(Arc::new(PgStore::new(pool.clone())), Arc::new(auth), config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
