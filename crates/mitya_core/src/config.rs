use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MityaConfig {
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub engine: EngineConfig,
    pub voice: VoiceConfig,
    pub bot: BotConfig,
}

impl MityaConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields. Env var overrides are applied after loading.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: MityaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file doesn't exist, return defaults
    /// with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("OLLAMA_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("MITYA_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_API_TOKEN") {
            self.llm.api_token = Some(v);
        }
        if let Ok(v) = std::env::var("MITYA_DB_PATH") {
            self.storage.db_path = v;
        }
        if let Ok(v) = std::env::var("WHISPER_URL") {
            self.voice.whisper_url = Some(v);
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "mitya.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Sent as a bearer token when the completion endpoint sits behind auth.
    pub api_token: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Timeout for the main chat completion call.
    pub request_timeout_secs: u64,
    /// Timeout for the advisory sentiment call. Kept well under
    /// `request_timeout_secs` so a stalled classifier cannot stall a turn.
    pub classifier_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "mitya-gemma".to_string(),
            api_token: None,
            max_tokens: 150,
            temperature: 0.7,
            request_timeout_secs: 30,
            classifier_timeout_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Newest turns kept per chat.
    pub context_window: u32,
    /// Turns older than this many hours are left out of the prompt.
    /// 0 disables the time filter.
    pub recency_window_hours: u64,
    /// "ru" or "en"; affects persona text and the sentiment rubric.
    pub language: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_window: 20,
            recency_window_hours: 6,
            language: "ru".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Transcription endpoint. Voice notes are declined when unset.
    pub whisper_url: Option<String>,
    pub language: String,
    pub request_timeout_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            whisper_url: None,
            language: "ru".to_string(),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Addressing word that wakes the bot up in group chats.
    pub trigger_word: String,
    /// Prefix for the novelty phrase commands.
    pub buddy_prefix: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            trigger_word: "митя".to_string(),
            buddy_prefix: "братан".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
