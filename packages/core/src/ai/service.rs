//! AI Service
//!
//! Orchestrates the four generation operations. Every operation follows
//! the same sequence:
//!
//! 1. Load the caller's API key ([`SettingsService::require_api_key`])
//! 2. Validate the request's required fields
//! 3. Make exactly one provider call with the caller's key
//! 4. Check/shape the response
//!
//! Steps 1 and 2 fail before any provider call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::ai::contracts::{
    parse_analysis, parse_suggestions, SuggestionSet, TextAnalysis, ANALYSIS_SYSTEM_PROMPT,
    SUGGESTIONS_SYSTEM_PROMPT,
};
use crate::ai::{
    ChatMessage, ChatOptions, ChatRequest, GenerationProvider, ImageOptions, ImageQuality,
    ImageRequest, ImageSize, ResponseFormat, TextAction, Usage,
};
use crate::services::{ServiceError, SettingsService};
use crate::storage::{ObjectStore, CANVAS_FILES_BUCKET};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub size: Option<ImageSize>,
    #[serde(default)]
    pub quality: Option<ImageQuality>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    /// Durable URL in object storage
    pub url: String,
    /// Prompt as rewritten by the provider, passed through unchanged
    #[serde(rename = "revised_prompt")]
    pub revised_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionInput {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisInput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextInput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextOutput {
    pub text: String,
    pub usage: Option<Usage>,
}

/// A required, non-blank field
fn required<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str, ServiceError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::invalid_input(message))
}

fn with_context(base: &str, context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!("{}\n\nContext: {}", base, context),
        None => base.to_string(),
    }
}

pub struct AiService {
    settings: Arc<SettingsService>,
    provider: Arc<dyn GenerationProvider>,
    store: Arc<dyn ObjectStore>,
    chat_options: ChatOptions,
    image_options: ImageOptions,
}

impl AiService {
    pub fn new(
        settings: Arc<SettingsService>,
        provider: Arc<dyn GenerationProvider>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            settings,
            provider,
            store,
            chat_options: ChatOptions::default(),
            image_options: ImageOptions::default(),
        }
    }

    pub fn with_chat_options(mut self, options: ChatOptions) -> Self {
        self.chat_options = options;
        self
    }

    fn chat_request(
        &self,
        system: String,
        user: String,
        format: Option<ResponseFormat>,
    ) -> ChatRequest {
        ChatRequest {
            model: self.chat_options.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: self.chat_options.temperature,
            max_tokens: self.chat_options.max_tokens,
            response_format: format,
        }
    }

    /// Generate an image and move it to durable storage
    pub async fn generate_image(
        &self,
        user_id: &str,
        input: ImageInput,
    ) -> Result<StoredImage, ServiceError> {
        let api_key = self.settings.require_api_key(user_id).await?;
        let prompt = required(&input.prompt, "Prompt is required")?;

        let request = ImageRequest {
            model: self.image_options.model.clone(),
            prompt: prompt.to_string(),
            n: self.image_options.n,
            size: input.size.unwrap_or_default().as_str().to_string(),
            quality: input.quality.unwrap_or_default().as_str().to_string(),
        };

        let generated = self.provider.generate_image(&api_key, &request).await?;
        let file = self.provider.download(&generated.url).await?;

        let key = format!("{}/{}.{}", user_id, Uuid::new_v4(), file.extension());
        let url = self
            .store
            .put(
                CANVAS_FILES_BUCKET,
                &key,
                &file.bytes,
                file.content_type.as_deref(),
            )
            .await?;

        info!(
            user_id,
            provider = self.provider.name(),
            key = %key,
            size = %request.size,
            "generated image stored"
        );

        Ok(StoredImage {
            url,
            revised_prompt: generated.revised_prompt,
        })
    }

    /// Three follow-up ideas for a prompt
    pub async fn suggestions(
        &self,
        user_id: &str,
        input: SuggestionInput,
    ) -> Result<SuggestionSet, ServiceError> {
        let api_key = self.settings.require_api_key(user_id).await?;
        let prompt = required(&input.prompt, "Prompt is required")?;

        let request = self.chat_request(
            with_context(SUGGESTIONS_SYSTEM_PROMPT, input.context.as_deref()),
            prompt.to_string(),
            Some(ResponseFormat::json_object()),
        );
        let completion = self.provider.chat(&api_key, &request).await?;

        Ok(parse_suggestions(&completion.content)?)
    }

    /// Analyze `text` following the caller's instructions
    pub async fn analyze_text(
        &self,
        user_id: &str,
        input: AnalysisInput,
    ) -> Result<TextAnalysis, ServiceError> {
        let api_key = self.settings.require_api_key(user_id).await?;
        let instructions = required(&input.instructions, "Instructions are required")?;
        let text = input.text.as_deref().unwrap_or_default();

        let request = self.chat_request(
            ANALYSIS_SYSTEM_PROMPT.to_string(),
            format!("Instructions: {}\n\nText:\n{}", instructions, text),
            Some(ResponseFormat::json_object()),
        );
        let completion = self.provider.chat(&api_key, &request).await?;

        Ok(parse_analysis(&completion.content)?)
    }

    /// Apply a [`TextAction`] to `text`
    pub async fn transform_text(
        &self,
        user_id: &str,
        input: TextInput,
    ) -> Result<TextOutput, ServiceError> {
        let api_key = self.settings.require_api_key(user_id).await?;
        let text = required(&input.text, "Text is required")?;
        let action: TextAction = required(&input.action, "Action is required")?.parse()?;

        let request = self.chat_request(
            action.system_prompt(input.context.as_deref()),
            text.to_string(),
            None,
        );
        let completion = self.provider.chat(&api_key, &request).await?;

        info!(
            user_id,
            provider = self.provider.name(),
            action = %action,
            "text action completed"
        );

        Ok(TextOutput {
            text: completion.content,
            usage: completion.usage,
        })
    }
}
