//! Voice support for Mitya
//!
//! Provides the Speech-to-Text abstraction and the whisper-server client.
//! Transcription is an optional capability; the bot declines voice notes
//! when no implementation is wired in.

mod stt;
mod whisper;

pub use stt::{AudioFormat, SpeechToText, Transcript};
pub use whisper::WhisperHttpClient;
