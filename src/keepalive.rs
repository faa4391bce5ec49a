//! Liveness endpoints for free hosting tiers that idle silent processes.
//! No semantic role beyond answering 200.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tracing::info;

async fn root() -> &'static str {
    "relaypost is alive"
}

async fn healthz() -> &'static str {
    "ok"
}

fn router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
}

pub async fn serve(port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind keep-alive server to {addr}"))?;

    info!("Keep-alive server listening on {}", addr);

    axum::serve(listener, router())
        .await
        .context("Keep-alive server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn endpoints_answer() {
        assert_eq!(root().await, "relaypost is alive");
        assert_eq!(healthz().await, "ok");
    }
}
