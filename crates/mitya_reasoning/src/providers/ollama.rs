//! Ollama-style completion provider.
//!
//! Speaks the native API: `/api/chat` for conversations, `/api/generate`
//! for one-shot prompts. The two routes answer with different JSON shapes,
//! so decoding goes through one untagged enum.

use crate::llm::{ChatModel, CompletionParams};
use anyhow::{Context, Result};
use mitya_core::Turn;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    api_token: Option<String>,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build HTTP client")?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_token: None,
        })
    }

    /// Bearer token for deployments where the endpoint sits behind auth.
    pub fn with_api_token(mut self, token: &str) -> Self {
        self.api_token = Some(token.to_string());
        self
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<ModelReply> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(payload);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to completion endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let err_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion endpoint error {}: {}", status, err_text);
        }

        response
            .json()
            .await
            .context("Unexpected completion response shape")
    }
}

/// `/api/chat` answers with a nested message, `/api/generate` with a flat
/// `response` field. Accept either; anything else is a decode error.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ModelReply {
    Chat { message: ReplyMessage },
    Flat { response: String },
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplyMessage {
    content: String,
}

impl ModelReply {
    pub(crate) fn into_text(self) -> String {
        match self {
            ModelReply::Chat { message } => message.content,
            ModelReply::Flat { response } => response,
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for OllamaClient {
    async fn chat(&self, turns: &[Turn], params: &CompletionParams) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "messages": turns,
            "stream": false,
            "options": {
                "num_predict": params.max_tokens,
                "temperature": params.temperature,
            },
        });
        Ok(self.post("/api/chat", &payload).await?.into_text())
    }

    async fn generate(&self, prompt: &str, params: &CompletionParams) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "num_predict": params.max_tokens,
                "temperature": params.temperature,
            },
        });
        Ok(self.post("/api/generate", &payload).await?.into_text())
    }
}
