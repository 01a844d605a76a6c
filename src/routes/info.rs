//! Service info endpoint

use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::services::AppState;

/// Root endpoint
pub async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": format!("{} API", state.config().app_name),
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
