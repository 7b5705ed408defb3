//! AI Generation
//!
//! Client side of an OpenAI-compatible generation API, called on behalf of
//! a user with that user's own API key:
//!
//! - [`provider`] - the [`GenerationProvider`] seam and [`OpenAiProvider`]
//! - [`actions`] - text actions and their instruction templates
//! - [`contracts`] - shape checks for JSON-mode responses
//! - [`service`] - [`AiService`], the per-endpoint orchestration

pub mod actions;
pub mod contracts;
mod error;
pub mod options;
pub mod provider;
pub mod service;
mod types;

pub use actions::TextAction;
pub use contracts::{AnalysisOption, Suggestion, SuggestionSet, TextAnalysis};
pub use error::AiError;
pub use options::{ChatOptions, ImageOptions, ImageQuality, ImageSize};
pub use provider::{GenerationProvider, OpenAiProvider};
pub use service::{
    AiService, AnalysisInput, ImageInput, StoredImage, SuggestionInput, TextInput, TextOutput,
};
pub use types::{
    ChatCompletion, ChatMessage, ChatRequest, DownloadedFile, GeneratedImage, ImageRequest,
    ResponseFormat, Usage,
};
