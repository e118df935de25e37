//! Gemini `generateContent` over HTTP.

use async_trait::async_trait;
use fude_types::{GenerationError, GenerationRequest, GenerationResult};
use serde::{Deserialize, Serialize};

use crate::{GeminiConfig, GenerationClient, unexpected};

/// Client for the hosted Gemini API.
///
/// The credential travels as the `key` query parameter. A non-success status
/// becomes [`GenerationError::Transport`] carrying the service's
/// `error.message`; a success without text becomes
/// [`GenerationError::EmptyResult`].
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.config.endpoint())
            .finish()
    }
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> GenerationResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| unexpected("failed to build HTTP client", e))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: Content::user(&self.config.system_instruction),
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
                response_mime_type: &self.config.response_mime_type,
            },
        }
    }

    /// The request URL carries the credential, so it never reaches the message.
    fn send_error(&self, err: reqwest::Error) -> GenerationError {
        let err = err.without_url();
        match self.config.timeout_ms {
            Some(ms) if err.is_timeout() => GenerationError::Timeout(ms),
            _ => unexpected("request failed", err),
        }
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerationRequest) -> GenerationResult<String> {
        let mut builder = self
            .http
            .post(self.config.endpoint())
            .query(&[("key", request.credential.as_str())])
            .json(&self.request_body(&request.prompt_text));
        if let Some(timeout) = self.config.timeout() {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| self.send_error(e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.send_error(e))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|env| env.error)
                .and_then(|err| err.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            tracing::debug!(status = status.as_u16(), "generation service error: {message}");
            return Err(GenerationError::transport(status.as_u16(), message));
        }

        let parsed: GenerateContentResponse = serde_json::from_slice(&body)
            .map_err(|e| unexpected("invalid response body", e))?;
        parsed.first_text().ok_or(GenerationError::EmptyResult)
    }
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

impl<'a> Content<'a> {
    fn user(text: &'a str) -> Self {
        Self {
            role: "user",
            parts: vec![Part { text }],
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
    response_mime_type: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if non-empty.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.is_empty())
    }
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}
