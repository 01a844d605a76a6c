//! Health check endpoint

use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::error::Result;
use crate::services::AppState;

/// Probe the database and redis; either failing marks the service
/// degraded. Always responds 200 — this endpoint reports, it does not
/// propagate.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database = probe(state.ping_database().await);
    let redis = probe(state.ping_redis().await);

    let status = if database == "healthy" && redis == "healthy" {
        "healthy"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "database": database,
        "redis": redis,
    }))
}

fn probe(result: Result<()>) -> String {
    match result {
        Ok(()) => "healthy".to_string(),
        Err(e) => format!("unhealthy: {e}"),
    }
}
