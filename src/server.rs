//! Main server implementation

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{Result, ServerError};
use crate::routes;
use crate::services::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Job-opening bot HTTP server
pub struct Server {
    config: AppConfig,
    state: Arc<AppState>,
}

impl Server {
    /// Create a new server instance and eagerly connect every resource.
    /// A backend that is down at startup is logged, not fatal.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let state = Arc::new(AppState::new(config.clone()));
        state.connect_all().await;

        Ok(Self { config, state })
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let app = build_router(self.state.clone());
        let addr = self.socket_addr()?;

        info!("starting {} on {}", self.config.app_name, addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(format!("server error: {e}")))?;

        self.state.shutdown().await;
        info!("server stopped gracefully");
        Ok(())
    }

    fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.config.server_host, self.config.server_port)
            .parse()
            .map_err(|e| ServerError::Internal(format!("invalid server address: {e}")))
    }
}

/// Assemble the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config().server_timeout_seconds);

    Router::new()
        .route("/", get(routes::info::root))
        .route("/health", get(routes::health::health_check))
        .nest("/webhook", routes::webhooks::create_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    warn!("Starting graceful shutdown...");
}
