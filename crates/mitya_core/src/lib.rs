pub mod config;
pub mod persona;

pub use config::MityaConfig;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One entry in a chat's conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// Per-chat feature switches. A chat that was never configured behaves
/// as if this default row existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub ai_enabled: bool,
    pub voice_enabled: bool,
    /// Percent chance (0-100) of an unprompted reply in group chats.
    pub reply_chance: u8,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            ai_enabled: true,
            voice_enabled: true,
            reply_chance: 0,
        }
    }
}

/// Bounded per-chat conversation memory.
#[async_trait]
pub trait ContextLog: Send + Sync {
    /// Append one turn and drop whatever falls out of the retention window.
    async fn append(&self, chat_id: i64, turn: Turn) -> anyhow::Result<()>;

    /// The retained turns for a chat, oldest first. Empty for unseen chats.
    async fn recent(&self, chat_id: i64) -> anyhow::Result<Vec<Turn>>;
}

/// Durable per-(chat, user) reputation score.
#[async_trait]
pub trait ReputationLedger: Send + Sync {
    /// Add `delta` to the stored score, clamped to the ledger's bounds,
    /// and remember the latest display name. Best effort: implementations
    /// log storage errors instead of propagating them.
    async fn adjust(&self, chat_id: i64, user_id: i64, display_name: &str, delta: i64);

    /// Current score, 0 when the pair has never been scored.
    async fn reputation(&self, chat_id: i64, user_id: i64) -> i64;
}

/// Per-chat configuration rows, created lazily with defaults.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn chat_settings(&self, chat_id: i64) -> anyhow::Result<ChatSettings>;
    async fn set_ai_enabled(&self, chat_id: i64, enabled: bool) -> anyhow::Result<()>;
    async fn set_voice_enabled(&self, chat_id: i64, enabled: bool) -> anyhow::Result<()>;
    async fn set_reply_chance(&self, chat_id: i64, percent: u8) -> anyhow::Result<()>;
}
