//! Generation request and failure taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single prompt sent to the generation service.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    /// API key for the service.
    pub credential: String,
    /// The user's prompt, as typed.
    pub prompt_text: String,
}

impl GenerationRequest {
    pub fn new(credential: impl Into<String>, prompt_text: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            prompt_text: prompt_text.into(),
        }
    }
}

impl std::fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("credential", &"[REDACTED]")
            .field("prompt_text", &self.prompt_text)
            .finish()
    }
}

/// Why a generation produced no text.
///
/// `Display` is what the user sees after the controller's error prefix, so
/// transport errors render the service's message verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The service answered with a non-success status.
    #[error("{message}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Error text reported by the service.
        message: String,
    },

    /// Success status, but no text in the first candidate.
    #[error("No text generated")]
    EmptyResult,

    /// The configured timeout elapsed before the service answered.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Anything else: connection failures, undecodable bodies.
    #[error("{0}")]
    Unexpected(String),
}

impl GenerationError {
    pub fn transport(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

/// Result type for generation calls.
pub type GenerationResult<T> = Result<T, GenerationError>;
