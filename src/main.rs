use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use deliverydesk::api_router::configure_api_routes;
use deliverydesk::config::AppConfig;
use deliverydesk::shared::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config));

    // Escalates tickets left open past their rule-set response deadline.
    let sweeper = Arc::clone(&state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            match deliverydesk::tickets::escalate_overdue(&sweeper).await {
                Ok(0) => {}
                Ok(n) => info!(escalated = n, "response-deadline sweep"),
                Err(e) => tracing::warn!("response-deadline sweep failed: {e}"),
            }
        }
    });

    let app = configure_api_routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("deliverydesk listening on {addr}");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
