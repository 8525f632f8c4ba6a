use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::info;

use crate::{metrics, Result};

pub fn build_router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(gather_metrics))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn gather_metrics() -> String {
    metrics::gather_metrics()
}

/// Serves the health and metrics endpoints until the process exits.
pub async fn serve(addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Serving health and metrics");
    axum::serve(listener, build_router()).await?;
    Ok(())
}
