//! Deterministic in-process model for tests.

use crate::llm::{ChatModel, CompletionParams};
use anyhow::Result;
use mitya_core::Turn;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted model: answers with a fixed reply or a simulated transport
/// failure, and records everything it was called with.
pub struct MockModel {
    reply: Option<String>,
    delay: Option<Duration>,
    pub chat_calls: Mutex<Vec<Vec<Turn>>>,
    pub generate_calls: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            delay: None,
            chat_calls: Mutex::new(Vec::new()),
            generate_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            delay: None,
            chat_calls: Mutex::new(Vec::new()),
            generate_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait::async_trait]
impl ChatModel for MockModel {
    async fn chat(&self, turns: &[Turn], _params: &CompletionParams) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Ok(mut calls) = self.chat_calls.lock() {
            calls.push(turns.to_vec());
        }
        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => anyhow::bail!("mock transport failure"),
        }
    }

    async fn generate(&self, prompt: &str, _params: &CompletionParams) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Ok(mut calls) = self.generate_calls.lock() {
            calls.push(prompt.to_string());
        }
        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => anyhow::bail!("mock transport failure"),
        }
    }
}
