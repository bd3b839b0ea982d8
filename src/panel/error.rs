//! Panel error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Startup configuration errors. Fatal: the router cannot be built.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unsupported HTTP method {method}; only GET and POST are supported")]
    UnsupportedMethod { method: String },

    #[error("invalid route template {path}: {reason}")]
    InvalidTemplate { path: String, reason: String },

    #[error("route {path} references unknown controller {controller}")]
    UnknownController { path: String, controller: String },

    #[error("panel initialization failed: {0}")]
    Init(#[source] PanelError),
}

/// Per-request panel failures.
///
/// Everything except `NotFound` and `BadRequest` surfaces as a generic
/// 500; details go to the log, not the client.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("controller has no action {0}")]
    UnknownAction(String),

    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),

    #[error("storage failure: {0}")]
    Store(#[from] sqlx::Error),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        match self {
            PanelError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
            PanelError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            other => {
                error!(error = %other, "panel request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}
