//! Request options and their defaults
//!
//! | endpoint | key | default |
//! |---|---|---|
//! | image | `size` | `1024x1024` |
//! | image | `quality` | `standard` |
//! | image | model / n | `dall-e-3` / 1 |
//! | chat | model / temperature / max_tokens | `gpt-4o-mini` / 0.7 / 1000 |

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1024x1024")]
    Square,
    #[serde(rename = "1792x1024")]
    Landscape,
    #[serde(rename = "1024x1792")]
    Portrait,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Landscape => "1792x1024",
            ImageSize::Portrait => "1024x1792",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    #[default]
    Standard,
    Hd,
}

impl ImageQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageQuality::Standard => "standard",
            ImageQuality::Hd => "hd",
        }
    }
}

/// Settings shared by every chat completion
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ChatOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub model: String,
    pub n: u32,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_IMAGE_MODEL.to_string(),
            n: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_option_wire_names() {
        let size: ImageSize = serde_json::from_str("\"1792x1024\"").unwrap();
        assert_eq!(size, ImageSize::Landscape);
        assert!(serde_json::from_str::<ImageSize>("\"512x512\"").is_err());

        let quality: ImageQuality = serde_json::from_str("\"hd\"").unwrap();
        assert_eq!(quality.as_str(), "hd");
        assert_eq!(ImageSize::default().to_string(), "1024x1024");
    }
}
