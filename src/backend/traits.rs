//! Common traits and types for generation backends

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::{AppError, Result};

/// HTTP status codes that signal an exhausted quota
pub const QUOTA_EXCEEDED_STATUS_CODES: &[u16] = &[429];

/// Error message fragments that signal an exhausted quota
pub const QUOTA_EXCEEDED_KEYWORDS: &[&str] = &[
    "quota",
    "rate limit",
    "rate_limit",
    "resource_exhausted",
    "too many requests",
];

/// What a request asks a backend to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    #[serde(rename = "text")]
    TextGeneration,
    #[serde(rename = "image")]
    ImageGeneration,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextGeneration => "text",
            Self::ImageGeneration => "image",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked entry of the backend catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Provider model identifier, e.g. `gemini-2.0-flash-lite`
    pub identifier: String,
    pub kind: BackendKind,
}

impl BackendDescriptor {
    pub fn new(identifier: impl Into<String>, kind: BackendKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
        }
    }
}

/// A single logical generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub kind: BackendKind,
    /// Text prompt or image prompt
    pub payload: String,
}

impl GenerationRequest {
    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            kind: BackendKind::TextGeneration,
            payload: payload.into(),
        }
    }

    pub fn image(payload: impl Into<String>) -> Self {
        Self {
            kind: BackendKind::ImageGeneration,
            payload: payload.into(),
        }
    }

    /// Reject requests that carry no usable prompt
    pub fn validate(&self) -> Result<()> {
        if self.payload.trim().is_empty() {
            let field = match self.kind {
                BackendKind::TextGeneration => "message",
                BackendKind::ImageGeneration => "prompt",
            };
            return Err(AppError::InvalidRequest(format!("Missing {}", field)));
        }
        Ok(())
    }
}

/// Content produced by a successful invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GeneratedContent {
    Text(String),
    ImageBase64(String),
}

impl GeneratedContent {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Text(_) => BackendKind::TextGeneration,
            Self::ImageBase64(_) => BackendKind::ImageGeneration,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::ImageBase64(s) => s,
        }
    }

    pub fn into_inner(self) -> String {
        match self {
            Self::Text(s) | Self::ImageBase64(s) => s,
        }
    }
}

/// Coarse classification of a backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    QuotaExceeded,
    AuthenticationFailed,
    ServiceUnavailable,
    Network,
    InvalidResponse,
    Other,
}

impl FailureKind {
    /// Detect the failure kind from an optional HTTP status and the error text
    pub fn detect(status_code: Option<u16>, message: &str) -> Self {
        if let Some(code) = status_code {
            if QUOTA_EXCEEDED_STATUS_CODES.contains(&code) {
                return Self::QuotaExceeded;
            }
        }

        let lower = message.to_lowercase();
        if QUOTA_EXCEEDED_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Self::QuotaExceeded;
        }

        match status_code {
            Some(401) | Some(403) => Self::AuthenticationFailed,
            Some(500) | Some(502) | Some(503) | Some(504) => Self::ServiceUnavailable,
            _ => Self::Other,
        }
    }
}

/// Failure of one backend invocation, normalised to a single shape
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{detail}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub detail: String,
}

impl BackendError {
    /// Build an error whose kind is inferred from the message
    pub fn new(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            kind: FailureKind::detect(None, &detail),
            detail,
        }
    }

    /// Build an error from a non-success HTTP response
    pub fn from_status(status: u16, body: &str) -> Self {
        Self {
            kind: FailureKind::detect(Some(status), body),
            detail: format!("{} {}", status, body.trim()),
        }
    }

    pub fn with_kind(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Capability that performs the actual call to a generation provider
#[async_trait]
pub trait BackendInvoker: Send + Sync {
    /// Name of the provider behind this invoker, for logs
    fn name(&self) -> &str;

    /// Invoke one backend for one request
    async fn invoke(
        &self,
        backend: &BackendDescriptor,
        request: &GenerationRequest,
    ) -> std::result::Result<GeneratedContent, BackendError>;
}
