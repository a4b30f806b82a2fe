//! Fallback resolver: tries ranked backends one at a time until one succeeds

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::traits::{
    BackendDescriptor, BackendError, BackendInvoker, GeneratedContent, GenerationRequest,
};
use crate::error::{AppError, Result};
use crate::gateway::catalog::BackendCatalog;

/// Recorded result of invoking one backend during one resolve call
#[derive(Debug, Clone, Serialize)]
pub struct AttemptOutcome {
    pub backend: BackendDescriptor,
    pub result: Option<GeneratedContent>,
    pub error: Option<BackendError>,
    pub elapsed_ms: u64,
}

impl AttemptOutcome {
    fn success(backend: BackendDescriptor, content: GeneratedContent, elapsed: Duration) -> Self {
        Self {
            backend,
            result: Some(content),
            error: None,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    fn failure(backend: BackendDescriptor, error: BackendError, elapsed: Duration) -> Self {
        Self {
            backend,
            result: None,
            error: Some(error),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.result.is_some()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.detail.as_str())
    }
}

/// Terminal state of a resolve call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    Succeeded,
    /// Every backend in the catalog failed
    Exhausted,
    Cancelled,
    TimedOut,
}

/// Outcome of one resolve call
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub state: ResolutionState,
    /// Attempts in catalog order; on success the winner is last
    pub attempts: Vec<AttemptOutcome>,
}

impl Resolution {
    pub fn succeeded(&self) -> bool {
        self.state == ResolutionState::Succeeded
    }

    /// Identifier of the backend that produced the content
    pub fn winning_backend(&self) -> Option<&str> {
        self.winner().map(|a| a.backend.identifier.as_str())
    }

    pub fn content(&self) -> Option<&GeneratedContent> {
        self.winner().and_then(|a| a.result.as_ref())
    }

    /// Split a successful resolution into winner identifier and content
    pub fn into_success(mut self) -> Option<(String, GeneratedContent)> {
        if !self.succeeded() {
            return None;
        }
        let winner = self.attempts.pop()?;
        Some((winner.backend.identifier, winner.result?))
    }

    /// Turn a non-successful resolution into the error the caller should see
    pub fn into_error(self, request: &GenerationRequest, timeout: Option<Duration>) -> AppError {
        match self.state {
            ResolutionState::Cancelled => AppError::Cancelled,
            ResolutionState::TimedOut => AppError::Timeout(format!(
                "No {} backend answered within {}ms",
                request.kind,
                timeout.map(|t| t.as_millis()).unwrap_or_default()
            )),
            ResolutionState::Exhausted | ResolutionState::Succeeded => AppError::BackendsExhausted {
                kind: request.kind,
                attempts: self.attempts,
            },
        }
    }

    fn winner(&self) -> Option<&AttemptOutcome> {
        if self.succeeded() {
            self.attempts.last()
        } else {
            None
        }
    }
}

/// Executes the try-next-on-failure protocol over a shared catalog
pub struct FallbackResolver {
    catalog: Arc<BackendCatalog>,
    timeout: Option<Duration>,
}

impl FallbackResolver {
    /// Create a resolver without an overall deadline
    pub fn new(catalog: Arc<BackendCatalog>) -> Self {
        Self {
            catalog,
            timeout: None,
        }
    }

    /// Create a resolver whose resolve calls give up after `timeout`
    pub fn with_timeout(catalog: Arc<BackendCatalog>, timeout: Option<Duration>) -> Self {
        Self { catalog, timeout }
    }

    pub fn catalog(&self) -> &BackendCatalog {
        &self.catalog
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Resolve a request by invoking catalog backends in order.
    ///
    /// Fails only for an invalid request or an empty catalog; every other
    /// outcome, including exhaustion and cancellation, is a `Resolution`.
    /// Cancellation or the deadline drops the in-flight invocation without
    /// recording it and no later backend is tried.
    pub async fn resolve(
        &self,
        request: &GenerationRequest,
        invoker: &dyn BackendInvoker,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        request.validate()?;
        let candidates = self.catalog.backends_for(request.kind)?;

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut attempts = Vec::with_capacity(candidates.len());

        for (index, backend) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(interrupted(ResolutionState::Cancelled, request, attempts));
            }

            debug!(
                kind = %request.kind,
                backend = %backend.identifier,
                position = index,
                candidates = candidates.len(),
                invoker = invoker.name(),
                "Trying backend"
            );

            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Ok(interrupted(ResolutionState::Cancelled, request, attempts));
                }
                _ = deadline_reached(deadline) => {
                    return Ok(interrupted(ResolutionState::TimedOut, request, attempts));
                }
                result = invoker.invoke(backend, request) => result,
            };
            let elapsed = started.elapsed();

            match result {
                Ok(content) => {
                    info!(
                        kind = %request.kind,
                        backend = %backend.identifier,
                        attempts = index + 1,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Backend succeeded"
                    );
                    attempts.push(AttemptOutcome::success(backend.clone(), content, elapsed));
                    return Ok(Resolution {
                        state: ResolutionState::Succeeded,
                        attempts,
                    });
                }
                Err(error) => {
                    warn!(
                        kind = %request.kind,
                        backend = %backend.identifier,
                        failure = ?error.kind,
                        error = %error.detail,
                        "Backend failed, trying next"
                    );
                    attempts.push(AttemptOutcome::failure(backend.clone(), error, elapsed));
                }
            }
        }

        warn!(
            kind = %request.kind,
            attempts = attempts.len(),
            "All backends exhausted"
        );
        Ok(Resolution {
            state: ResolutionState::Exhausted,
            attempts,
        })
    }
}

fn interrupted(
    state: ResolutionState,
    request: &GenerationRequest,
    attempts: Vec<AttemptOutcome>,
) -> Resolution {
    info!(
        kind = %request.kind,
        state = ?state,
        completed_attempts = attempts.len(),
        "Resolve interrupted"
    );
    Resolution { state, attempts }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
