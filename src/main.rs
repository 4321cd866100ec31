use anyhow::Context;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod state;
mod workflow;

#[cfg(test)]
mod test;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("loading configuration")?;
    let pool = db::init_db_pool(&config.database_url, config.max_connections)
        .await
        .context("opening database")?;

    let addr = config.server_addr();
    let seed = config.seed_demo_data;
    let state = AppState::new(config, pool);

    if seed {
        services::seed::seed_demo_data(&state)
            .await
            .map_err(|e| anyhow::anyhow!("seeding demo data: {e}"))?;
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "clex brokerage server listening");

    axum::serve(listener, handlers::app(state)).await?;
    Ok(())
}
