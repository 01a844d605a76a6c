//! Error handling for the bot backend

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// An external resource could not be constructed (unreachable host,
    /// bad credentials). The lifecycle cell stays absent so the next
    /// access attempts a fresh connection.
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::ResourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Llm(_) => StatusCode::BAD_GATEWAY,
            ServerError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error kind for API responses
    pub fn error_kind(&self) -> &'static str {
        match self {
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::ResourceUnavailable(_) => "RESOURCE_UNAVAILABLE",
            ServerError::Database(_) => "DATABASE_ERROR",
            ServerError::Store(_) => "STORE_ERROR",
            ServerError::Llm(_) => "LLM_ERROR",
            ServerError::Serialization(_) => "SERIALIZATION_ERROR",
            ServerError::Io(_) => "IO_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_kind = self.error_kind();
        let message = self.to_string();

        tracing::error!(
            error = %self,
            status = %status,
            error_kind = error_kind,
            "Server error occurred"
        );

        let body = Json(json!({
            "error_kind": error_kind,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Convert from redis errors
impl From<redis::RedisError> for ServerError {
    fn from(err: redis::RedisError) -> Self {
        ServerError::Store(err.to_string())
    }
}

/// Convert from HTTP client errors raised while talking to the LLM API
impl From<reqwest::Error> for ServerError {
    fn from(err: reqwest::Error) -> Self {
        ServerError::Llm(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_unavailable_maps_to_503() {
        let err = ServerError::ResourceUnavailable("database connect failed".to_string());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_kind(), "RESOURCE_UNAVAILABLE");
    }

    #[test]
    fn llm_errors_map_to_bad_gateway() {
        let err = ServerError::Llm("provider rejected request".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_kind(), "LLM_ERROR");
    }

    #[test]
    fn redis_errors_become_store_errors() {
        let err: ServerError =
            redis::RedisError::from((redis::ErrorKind::IoError, "connection refused")).into();
        assert!(matches!(err, ServerError::Store(_)));
        assert_eq!(err.error_kind(), "STORE_ERROR");
    }
}
