//! Generation provider seam and its OpenAI-compatible implementation
//!
//! Every call carries the caller's own API key. Nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::ai::{
    AiError, ChatCompletion, ChatRequest, DownloadedFile, GeneratedImage, ImageRequest, Usage,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Provider-agnostic generation interface
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn chat(&self, api_key: &str, request: &ChatRequest) -> Result<ChatCompletion, AiError>;

    async fn generate_image(
        &self,
        api_key: &str,
        request: &ImageRequest,
    ) -> Result<GeneratedImage, AiError>;

    /// Fetch a (transient) URL returned by the provider
    async fn download(&self, url: &str) -> Result<DownloadedFile, AiError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Any API speaking the OpenAI chat and image generation protocol
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        api_key: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, AiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "calling generation API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(AiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = upstream_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Generation request failed")
                    .to_string()
            });
            warn!(status = status.as_u16(), message = %message, "generation API returned an error");
            return Err(AiError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AiError::contract(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProviderErrorDetail {
    Object { message: String },
    Text(String),
}

/// `error.message` (or a string `error`) from a provider error body
fn upstream_message(body: &str) -> Option<String> {
    let parsed: ProviderErrorBody = serde_json::from_str(body).ok()?;
    let message = match parsed.error {
        ProviderErrorDetail::Object { message } => message,
        ProviderErrorDetail::Text(message) => message,
    };
    Some(message).filter(|m| !m.trim().is_empty())
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<GeneratedImage>,
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    async fn chat(&self, api_key: &str, request: &ChatRequest) -> Result<ChatCompletion, AiError> {
        let response: ChatCompletionResponse =
            self.post_json("/chat/completions", api_key, request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::contract("no content in response"))?;

        Ok(ChatCompletion {
            content,
            usage: response.usage,
        })
    }

    async fn generate_image(
        &self,
        api_key: &str,
        request: &ImageRequest,
    ) -> Result<GeneratedImage, AiError> {
        let response: ImageResponse = self
            .post_json("/images/generations", api_key, request)
            .await?;

        response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| AiError::contract("no image in response"))
    }

    async fn download(&self, url: &str) -> Result<DownloadedFile, AiError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AiError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Upstream {
                status: status.as_u16(),
                message: format!("Failed to download generated image: HTTP {}", status),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(AiError::from_transport)?;

        Ok(DownloadedFile {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}
