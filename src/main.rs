use std::sync::Arc;

use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use funnelserver::api_router::build_router;
use funnelserver::config::AppConfig;
use funnelserver::shared::state::AppState;
use funnelserver::shared::utils::run_migrations;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = Arc::new(AppState::new(config)?);

    run_migrations(&state.conn)
        .map_err(|e| anyhow::anyhow!("failed to run migrations: {}", e))?;
    info!("database migrations are up to date");

    let app = build_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("funnelserver listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
