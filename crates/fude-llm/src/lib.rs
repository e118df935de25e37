//! Generation clients.
//!
//! A [`GenerationClient`] turns one prompt into one block of generated text.
//! There is no streaming, no retry and no conversation history: each call is
//! a single request with a fixed system instruction and sampling setup.
//!
//! - [`GeminiClient`]: the hosted service over HTTP
//! - [`EchoGenerator`]: offline stub that echoes the prompt back

mod config;
mod echo;
mod gemini;

pub use config::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_SYSTEM_INSTRUCTION, GeminiConfig};
pub use echo::EchoGenerator;
pub use gemini::GeminiClient;

use std::sync::Arc;

use async_trait::async_trait;
use fude_types::{GenerationError, GenerationRequest, GenerationResult};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Something that can answer a prompt.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Provider name (e.g. "gemini", "echo").
    fn name(&self) -> &str;

    /// Generate text for a prompt. One attempt; errors are typed.
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult<String>;
}

/// Which client to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Echo,
}

/// Build the client for `kind`.
pub fn client_for(
    kind: ProviderKind,
    config: &GeminiConfig,
) -> GenerationResult<Arc<dyn GenerationClient>> {
    let client: Arc<dyn GenerationClient> = match kind {
        ProviderKind::Gemini => Arc::new(GeminiClient::new(config.clone())?),
        ProviderKind::Echo => Arc::new(EchoGenerator::new()),
    };
    Ok(client)
}

/// Shorthand used by clients for wrapping transport-level failures.
pub(crate) fn unexpected(context: &str, err: impl std::fmt::Display) -> GenerationError {
    GenerationError::unexpected(format!("{context}: {err}"))
}
