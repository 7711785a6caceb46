use anyhow::Result;
use async_trait::async_trait;
use mitya_core::Turn;

/// Generation parameters forwarded to the completion endpoint.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Output length cap
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 150,
            temperature: 0.7,
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Chat completion over an ordered turn history.
    async fn chat(&self, turns: &[Turn], params: &CompletionParams) -> Result<String>;

    /// One-shot completion for a bare prompt. Used for short advisory
    /// calls that don't need conversation state.
    async fn generate(&self, prompt: &str, params: &CompletionParams) -> Result<String>;
}
