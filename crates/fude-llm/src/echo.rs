//! Offline stand-in for a generation service.

use std::time::Duration;

use async_trait::async_trait;
use fude_types::{GenerationRequest, GenerationResult};

use crate::GenerationClient;

/// Answers every prompt by echoing it back. Never fails.
#[derive(Debug, Clone, Default)]
pub struct EchoGenerator {
    delay: Option<Duration>,
}

impl EchoGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait before answering, to stand in for network latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn reply(prompt: &str) -> String {
        format!("This is not calling any API for now. You wrote: {prompt}")
    }
}

#[async_trait]
impl GenerationClient for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: &GenerationRequest) -> GenerationResult<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Self::reply(&request.prompt_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_prompt() {
        let echo = EchoGenerator::new();
        let text = echo
            .generate(&GenerationRequest::new("", "Hello"))
            .await
            .unwrap();
        assert_eq!(text, "This is not calling any API for now. You wrote: Hello");
    }
}
