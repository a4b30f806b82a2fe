//! Request handlers for the generation endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::backend::traits::{BackendKind, GenerationRequest};
use crate::error::{AppError, Result};
use crate::response::GenerationResponse;
use crate::AppState;

/// `message` parameter accepted by `/chat`, from query string or JSON body
#[derive(Debug, Default, Deserialize)]
pub struct ChatParams {
    #[serde(default)]
    pub message: Option<String>,
}

/// `prompt` parameter accepted by `/image`, from query string or JSON body
#[derive(Debug, Default, Deserialize)]
pub struct ImageParams {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub text_backends: usize,
    pub image_backends: usize,
    /// Overall resolve deadline, 0 when disabled
    pub resolver_timeout_ms: u64,
}

pub async fn home() -> &'static str {
    "Generation gateway is online"
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let catalog = state.resolver.catalog();
    Json(HealthResponse {
        status: "ok",
        text_backends: catalog.len(BackendKind::TextGeneration),
        image_backends: catalog.len(BackendKind::ImageGeneration),
        resolver_timeout_ms: state.settings.resolver.timeout_ms,
    })
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ChatParams>, QueryRejection>,
    body: Option<Json<ChatParams>>,
) -> Result<Json<GenerationResponse>> {
    let Query(query) = query.map_err(invalid_query)?;
    let message = pick(query.message, body.and_then(|Json(b)| b.message));
    generate(&state, GenerationRequest::text(message)).await
}

pub async fn image(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ImageParams>, QueryRejection>,
    body: Option<Json<ImageParams>>,
) -> Result<Json<GenerationResponse>> {
    let Query(query) = query.map_err(invalid_query)?;
    let prompt = pick(query.prompt, body.and_then(|Json(b)| b.prompt));
    generate(&state, GenerationRequest::image(prompt)).await
}

fn invalid_query(rejection: QueryRejection) -> AppError {
    AppError::InvalidRequest(rejection.body_text())
}

/// Query string wins; an empty query value falls back to the body
fn pick(query: Option<String>, body: Option<String>) -> String {
    query
        .filter(|v| !v.is_empty())
        .or(body)
        .unwrap_or_default()
}

async fn generate(state: &AppState, request: GenerationRequest) -> Result<Json<GenerationResponse>> {
    let request_id = Uuid::new_v4();
    let span = info_span!("generate", request_id = %request_id, kind = %request.kind);

    async move {
        let cancel = state.shutdown.child_token();
        let resolution = state
            .resolver
            .resolve(&request, state.invoker.as_ref(), &cancel)
            .await?;

        if !resolution.succeeded() {
            return Err(resolution.into_error(&request, state.resolver.timeout()));
        }

        let attempts = resolution.attempts.len();
        let (model_used, content) = resolution
            .into_success()
            .ok_or_else(|| AppError::Internal("Successful resolution without content".to_string()))?;

        info!(model_used = %model_used, attempts, "Request served");
        Ok(Json(GenerationResponse::new(model_used, content)))
    }
    .instrument(span)
    .await
}
