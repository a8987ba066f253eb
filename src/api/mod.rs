pub mod routes;

use crate::ai::AiAssist;
use crate::config::Config;
use anyhow::{Context, Result};
use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub async fn run_server(config: Arc<Config>) -> Result<()> {
    let port = config.api_port;
    let assist = AiAssist::from_config(&config).map(Arc::new);
    let ai_configured = assist.is_some();
    let state = routes::ApiState { config, assist };
    let app: Router = routes::router(state);

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server: {addr}"))?;

    info!(address = %addr, ai_configured, "moodlog API server started");

    axum::serve(listener, app)
        .await
        .context("API server failed")?;

    Ok(())
}
