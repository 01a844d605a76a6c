//! Webhook endpoints for inbound WAHA and Google Sheets notifications.
//!
//! Both handlers are explicit not-yet-implemented stubs: they accept any
//! payload and return a static acknowledgement. Real message parsing and
//! the RAG pipeline plug in per [`WebhookSource`] variant.

use std::sync::Arc;

use axum::body::Bytes;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};

use crate::services::AppState;

/// Inbound webhook sources.
#[derive(Debug, Clone, Copy)]
enum WebhookSource {
    WhatsApp,
    Sheets,
}

impl WebhookSource {
    fn as_str(self) -> &'static str {
        match self {
            Self::WhatsApp => "whatsapp",
            Self::Sheets => "sheets",
        }
    }
}

/// Create webhook routes
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/whatsapp", post(whatsapp_webhook))
        .route("/sheets", post(sheets_webhook))
}

/// WhatsApp messages forwarded by WAHA
async fn whatsapp_webhook(body: Bytes) -> Json<Value> {
    acknowledge(WebhookSource::WhatsApp, &body)
}

/// Google Sheets change notifications
async fn sheets_webhook(body: Bytes) -> Json<Value> {
    acknowledge(WebhookSource::Sheets, &body)
}

fn acknowledge(source: WebhookSource, body: &Bytes) -> Json<Value> {
    tracing::debug!(
        source = source.as_str(),
        bytes = body.len(),
        "webhook received; handler not implemented"
    );
    Json(json!({ "status": "webhook received" }))
}
