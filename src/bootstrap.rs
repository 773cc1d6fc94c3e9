use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::{api::mailer::Mailer, app_state::AppState, config, db, sweeper};

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

pub fn init_env() {
    dotenvy::dotenv().ok();
}

/// Build the shared state, start the order-cleanup sweeper and serve the
/// given router until shutdown.
pub async fn bootstrap(service_name: &str, app: Router<AppState>) -> Result<()> {
    let config = Arc::new(config::load()?);
    let db_pool = db::create_pool(&config.database.url).await?;
    let mailer = Mailer::new(&config.smtp)?;

    let state = AppState {
        db_pool,
        http_client: reqwest::Client::new(),
        mailer,
        config: config.clone(),
    };

    tokio::spawn(sweeper::run(state.clone()));

    let app = app.with_state(state).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("{service_name} listening on {addr}");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
