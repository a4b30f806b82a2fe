//! Gemini / Imagen HTTP invoker

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::backend::traits::{
    BackendDescriptor, BackendError, BackendInvoker, BackendKind, FailureKind, GeneratedContent,
    GenerationRequest,
};
use crate::config::GeminiConfig;
use crate::error::{AppError, Result};
use crate::response::base64;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Invoker that calls the Google Generative Language API
pub struct GeminiInvoker {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
struct PredictParameters {
    #[serde(rename = "sampleCount")]
    sample_count: u32,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default, rename = "bytesBase64Encoded")]
    bytes_base64_encoded: Option<String>,
}

impl GeminiInvoker {
    /// Create a new invoker from configuration
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, identifier: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, identifier, method)
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> std::result::Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            BackendError::with_kind(FailureKind::AuthenticationFailed, "API key not configured")
        })?;

        debug!(url = %url, "Sending generation request");

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await
            .map_err(BackendError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), &body));
        }

        response.json::<R>().await.map_err(|e| {
            BackendError::with_kind(
                FailureKind::InvalidResponse,
                format!("Failed to parse response: {}", e),
            )
        })
    }

    async fn generate_text(
        &self,
        backend: &BackendDescriptor,
        prompt: &str,
    ) -> std::result::Result<GeneratedContent, BackendError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: None,
        };

        let response: GenerateContentResponse = self
            .post(&self.endpoint(&backend.identifier, "generateContent"), &body)
            .await?;

        let text: String = first_parts(response)
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            return Err(BackendError::with_kind(
                FailureKind::InvalidResponse,
                "Response contained no text",
            ));
        }
        Ok(GeneratedContent::Text(text))
    }

    async fn generate_image(
        &self,
        backend: &BackendDescriptor,
        prompt: &str,
    ) -> std::result::Result<GeneratedContent, BackendError> {
        let encoded = if backend.identifier.starts_with("imagen") {
            let body = PredictRequest {
                instances: vec![PredictInstance { prompt }],
                parameters: PredictParameters { sample_count: 1 },
            };
            let response: PredictResponse = self
                .post(&self.endpoint(&backend.identifier, "predict"), &body)
                .await?;
            response
                .predictions
                .into_iter()
                .find_map(|p| p.bytes_base64_encoded)
        } else {
            let body = GenerateContentRequest {
                contents: vec![Content {
                    parts: vec![TextPart { text: prompt }],
                }],
                generation_config: Some(GenerationConfig {
                    response_modalities: vec!["TEXT", "IMAGE"],
                }),
            };
            let response: GenerateContentResponse = self
                .post(&self.endpoint(&backend.identifier, "generateContent"), &body)
                .await?;
            first_parts(response)
                .into_iter()
                .find_map(|p| p.inline_data.map(|d| d.data))
        };

        let encoded = encoded.ok_or_else(|| {
            BackendError::with_kind(FailureKind::InvalidResponse, "Response contained no image")
        })?;

        base64::normalize(&encoded)
            .map(GeneratedContent::ImageBase64)
            .ok_or_else(|| {
                BackendError::with_kind(
                    FailureKind::InvalidResponse,
                    "Response image is not valid base64",
                )
            })
    }
}

fn first_parts(response: GenerateContentResponse) -> Vec<ResponsePart> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default()
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            BackendError::with_kind(FailureKind::Network, format!("Connection failed: {}", e))
        } else if let Some(status) = e.status() {
            BackendError::from_status(status.as_u16(), &e.to_string())
        } else {
            BackendError::new(e.to_string())
        }
    }
}

#[async_trait]
impl BackendInvoker for GeminiInvoker {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn invoke(
        &self,
        backend: &BackendDescriptor,
        request: &GenerationRequest,
    ) -> std::result::Result<GeneratedContent, BackendError> {
        match request.kind {
            BackendKind::TextGeneration => self.generate_text(backend, &request.payload).await,
            BackendKind::ImageGeneration => self.generate_image(backend, &request.payload).await,
        }
    }
}
