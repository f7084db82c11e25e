// Loyalty Platform - API Server
// REST + GraphQL over the SQLite document store.

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use loyalty_platform::auth::AccessGate;
use loyalty_platform::config::Config;
use loyalty_platform::rest::{build_router, AppState};
use loyalty_platform::store::Storage;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    if config.uses_default_secret() {
        warn!("LOYALTY_JWT_SECRET not set, using the development secret");
    }

    let storage = Storage::sqlite(&config.database_path).with_context(|| {
        format!(
            "failed to open document store at {}",
            config.database_path.display()
        )
    })?;

    let gate = AccessGate::new(config.jwt_secret.clone(), config.token_ttl_secs);
    let state = AppState::new(storage, gate);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "loyalty platform listening");

    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}
