//! HTTP client for a whisper-server transcription endpoint.

use crate::stt::{AudioFormat, SpeechToText, Transcript};
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub struct WhisperHttpClient {
    client: Client,
    url: String,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
}

impl WhisperHttpClient {
    pub fn new(url: &str, language: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build HTTP client")?,
            url: url.to_string(),
            language: language.map(|l| l.to_string()),
        })
    }
}

#[async_trait::async_trait]
impl SpeechToText for WhisperHttpClient {
    async fn transcribe(&self, audio: Vec<u8>, format: AudioFormat) -> Result<Transcript> {
        let part = Part::bytes(audio)
            .file_name(format.upload_name())
            .mime_str(format.mime_type())
            .context("Invalid MIME type for audio part")?;

        let mut form = Form::new()
            .part("file", part)
            .text("response_format", "json");
        if let Some(lang) = &self.language {
            form = form.text("language", lang.clone());
        }

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach transcription endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let err_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Transcription endpoint error {}: {}", status, err_text);
        }

        let parsed: InferenceResponse = response
            .json()
            .await
            .context("Unexpected transcription response shape")?;

        Ok(Transcript {
            text: parsed.text.trim().to_string(),
            language: parsed.language,
        })
    }

    fn provider_name(&self) -> &'static str {
        "whisper-server"
    }
}
