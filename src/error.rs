//! Common error types for the generation gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::backend::traits::{BackendKind, FailureKind};
use crate::gateway::resolver::AttemptOutcome;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("No backend configured for {0} generation")]
    NoBackendConfigured(BackendKind),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("All {kind} models exhausted after {} attempts", .attempts.len())]
    BackendsExhausted {
        kind: BackendKind,
        attempts: Vec<AttemptOutcome>,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format (OpenAI compatible)
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<Vec<AttemptSummary>>,
}

/// Diagnostic view of one failed attempt
#[derive(Serialize)]
pub struct AttemptSummary {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&AttemptOutcome> for AttemptSummary {
    fn from(attempt: &AttemptOutcome) -> Self {
        Self {
            backend: attempt.backend.identifier.clone(),
            failure: attempt.error.as_ref().map(|e| e.kind),
            detail: attempt.error.as_ref().map(|e| e.detail.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::NoBackendConfigured(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", Some("no_backend_configured")),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", None),
            AppError::BackendsExhausted { kind: BackendKind::TextGeneration, .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limit_error", Some("all_models_exhausted"))
            }
            AppError::BackendsExhausted { kind: BackendKind::ImageGeneration, .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "backend_error", Some("all_models_exhausted"))
            }
            AppError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "server_error", Some("cancelled")),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout_error", None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        };

        let attempts = match &self {
            AppError::BackendsExhausted { attempts, .. } => {
                Some(attempts.iter().map(AttemptSummary::from).collect())
            }
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: error_type.to_string(),
                code: code.map(|c| c.to_string()),
                attempts,
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
