//! Gemini client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You will genearate a response to the following prompt";

/// Endpoint, model and sampling setup for [`crate::GeminiClient`].
///
/// Every field has a default, so a config file only names what it changes:
///
/// ```ron
/// (model: "gemini-1.5-flash", timeout_ms: Some(30000))
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub system_instruction: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
    /// Per-request timeout. `None` waits as long as the service takes.
    pub timeout_ms: Option<u64>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
            timeout_ms: None,
        }
    }
}

impl GeminiConfig {
    /// Point the client at another server (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Full URL of the generate call, without the key.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint() {
        assert_eq!(
            GeminiConfig::default().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn trailing_slash_in_base_url() {
        let config = GeminiConfig::default().with_base_url("http://localhost:1234/");
        assert_eq!(
            config.endpoint(),
            "http://localhost:1234/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let config: GeminiConfig =
            ron::from_str("(model: \"gemini-1.5-flash\", timeout_ms: Some(250))").unwrap();
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.top_k, 40);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }
}
