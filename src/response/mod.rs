//! Response handling module - success bodies and base64 helpers

pub mod base64;

use serde::Serialize;

use crate::backend::traits::GeneratedContent;

/// Body returned by `/chat` on success
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub status: &'static str,
    pub r#type: &'static str,
    pub model_used: String,
    pub response: String,
}

/// Body returned by `/image` on success
#[derive(Debug, Clone, Serialize)]
pub struct ImageResponse {
    pub status: &'static str,
    pub r#type: &'static str,
    pub model_used: String,
    /// Base64 encoded image
    pub data: String,
}

/// Success body for whichever content the winning backend produced
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GenerationResponse {
    Chat(ChatResponse),
    Image(ImageResponse),
}

impl GenerationResponse {
    pub fn new(model_used: String, content: GeneratedContent) -> Self {
        match content {
            GeneratedContent::Text(response) => Self::Chat(ChatResponse {
                status: "success",
                r#type: "text",
                model_used,
                response,
            }),
            GeneratedContent::ImageBase64(data) => Self::Image(ImageResponse {
                status: "success",
                r#type: "image",
                model_used,
                data,
            }),
        }
    }
}
