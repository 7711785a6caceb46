//! Speech-to-Text trait definition

use anyhow::Result;
use async_trait::async_trait;

/// Supported audio formats for transcription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// WAV format
    Wav,
    /// MP3 format
    Mp3,
    /// OGG Opus (Telegram voice notes)
    OggOpus,
}

impl AudioFormat {
    /// Get the MIME type for this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::OggOpus => "audio/ogg",
        }
    }

    /// File name used when the payload travels as a form upload
    pub fn upload_name(&self) -> &'static str {
        match self {
            Self::Wav => "voice.wav",
            Self::Mp3 => "voice.mp3",
            Self::OggOpus => "voice.ogg",
        }
    }
}

/// Transcription result
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    /// Detected language, when the engine reports one
    pub language: Option<String>,
}

/// Speech-to-Text trait for transcribing audio to text
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe raw audio bytes to text
    async fn transcribe(&self, audio: Vec<u8>, format: AudioFormat) -> Result<Transcript>;

    /// Get the name of this STT provider
    fn provider_name(&self) -> &'static str;
}
