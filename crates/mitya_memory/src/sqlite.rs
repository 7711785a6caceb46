use anyhow::{Context, Result};
use async_trait::async_trait;
use mitya_core::{ChatSettings, ContextLog, ReputationLedger, Role, SettingsStore, Turn};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;

/// Reputation clamp bounds. Applied inside the upsert itself, so
/// concurrent adjustments cannot drift a score outside the range.
pub const REPUTATION_MIN: i64 = -150;
pub const REPUTATION_MAX: i64 = 150;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Newest turns kept per chat.
    pub context_window: u32,
    /// When set, `recent` skips turns older than this many hours.
    pub recency_window_hours: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            context_window: 20,
            recency_window_hours: Some(6),
        }
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    config: StoreConfig,
}

impl SqliteStore {
    pub async fn new<P: AsRef<Path>>(db_path: P, config: StoreConfig) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .connect(&db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool, config };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chats (
                chat_id INTEGER PRIMARY KEY,
                ai_enabled INTEGER NOT NULL DEFAULT 1,
                voice_enabled INTEGER NOT NULL DEFAULT 1,
                reply_chance INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create chats table")?;

        // Add reply_chance if it doesn't exist (pre-interjection deployments)
        if let Err(e) = sqlx::query("ALTER TABLE chats ADD COLUMN reply_chance INTEGER NOT NULL DEFAULT 0")
            .execute(&self.pool)
            .await
        {
            tracing::debug!("Column 'reply_chance' likely exists or migration skipped: {}", e);
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER NOT NULL,
                chat_id INTEGER NOT NULL,
                first_name TEXT NOT NULL DEFAULT '',
                reputation INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, chat_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create users table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create messages table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id, id)")
            .execute(&self.pool)
            .await
            .context("Failed to create messages chat index")?;

        Ok(())
    }
}

#[async_trait]
impl ReputationLedger for SqliteStore {
    async fn adjust(&self, chat_id: i64, user_id: i64, display_name: &str, delta: i64) {
        // One atomic upsert; read-modify-write from here would lose
        // updates under rapid-fire scoring of the same user.
        let sql = format!(
            r#"
            INSERT INTO users (user_id, chat_id, first_name, reputation)
            VALUES (?, ?, ?, MAX({min}, MIN({max}, ?)))
            ON CONFLICT(user_id, chat_id) DO UPDATE SET
                reputation = MAX({min}, MIN({max}, users.reputation + ?)),
                first_name = excluded.first_name
            "#,
            min = REPUTATION_MIN,
            max = REPUTATION_MAX,
        );
        let result = sqlx::query(&sql)
            .bind(user_id)
            .bind(chat_id)
            .bind(display_name)
            .bind(delta)
            .bind(delta)
            .execute(&self.pool)
            .await;

        if let Err(e) = result {
            tracing::warn!(
                "Reputation update failed for chat {} user {}: {}",
                chat_id,
                user_id,
                e
            );
        }
    }

    async fn reputation(&self, chat_id: i64, user_id: i64) -> i64 {
        let row = sqlx::query("SELECT reputation FROM users WHERE user_id = ? AND chat_id = ?")
            .bind(user_id)
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await;

        match row {
            Ok(Some(row)) => row.get::<i64, _>(0),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(
                    "Reputation read failed for chat {} user {}: {}",
                    chat_id,
                    user_id,
                    e
                );
                0
            }
        }
    }
}

#[async_trait]
impl ContextLog for SqliteStore {
    async fn append(&self, chat_id: i64, turn: Turn) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;

        sqlx::query("INSERT INTO messages (chat_id, role, content, timestamp) VALUES (?, ?, ?, ?)")
            .bind(chat_id)
            .bind(turn.role.as_str())
            .bind(&turn.content)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await
            .context("Failed to insert turn")?;

        // Keep only the newest N rows for this chat
        sqlx::query(
            r#"
            DELETE FROM messages WHERE chat_id = ? AND id NOT IN (
                SELECT id FROM messages WHERE chat_id = ?
                ORDER BY id DESC LIMIT ?
            )
            "#,
        )
        .bind(chat_id)
        .bind(chat_id)
        .bind(self.config.context_window as i64)
        .execute(&mut *tx)
        .await
        .context("Failed to prune old turns")?;

        tx.commit().await.context("Failed to commit turn")?;
        Ok(())
    }

    async fn recent(&self, chat_id: i64) -> Result<Vec<Turn>> {
        let rows = if let Some(hours) = self.config.recency_window_hours {
            let cutoff = chrono::Utc::now().timestamp() - (hours as i64) * 3600;
            sqlx::query(
                r#"
                SELECT role, content FROM (
                    SELECT id, role, content FROM messages
                    WHERE chat_id = ? AND timestamp > ?
                    ORDER BY id DESC LIMIT ?
                )
                ORDER BY id ASC
                "#,
            )
            .bind(chat_id)
            .bind(cutoff)
            .bind(self.config.context_window as i64)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                SELECT role, content FROM (
                    SELECT id, role, content FROM messages
                    WHERE chat_id = ?
                    ORDER BY id DESC LIMIT ?
                )
                ORDER BY id ASC
                "#,
            )
            .bind(chat_id)
            .bind(self.config.context_window as i64)
            .fetch_all(&self.pool)
            .await
        }
        .context("Failed to load recent turns")?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in rows {
            let role_str: String = row.get(0);
            match Role::parse(&role_str) {
                Some(role) => turns.push(Turn::new(role, row.get::<String, _>(1))),
                None => tracing::debug!("Skipping turn with unknown role '{}'", role_str),
            }
        }
        Ok(turns)
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn chat_settings(&self, chat_id: i64) -> Result<ChatSettings> {
        // Get-or-create in one statement; the no-op update makes
        // RETURNING yield the existing row on conflict.
        let row = sqlx::query(
            r#"
            INSERT INTO chats (chat_id) VALUES (?)
            ON CONFLICT(chat_id) DO UPDATE SET chat_id = excluded.chat_id
            RETURNING ai_enabled, voice_enabled, reply_chance
            "#,
        )
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to read chat settings")?;

        Ok(ChatSettings {
            ai_enabled: row.get::<i64, _>(0) != 0,
            voice_enabled: row.get::<i64, _>(1) != 0,
            reply_chance: row.get::<i64, _>(2).clamp(0, 100) as u8,
        })
    }

    async fn set_ai_enabled(&self, chat_id: i64, enabled: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chats (chat_id, ai_enabled) VALUES (?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET ai_enabled = excluded.ai_enabled
            "#,
        )
        .bind(chat_id)
        .bind(enabled as i64)
        .execute(&self.pool)
        .await
        .context("Failed to update ai_enabled")?;
        Ok(())
    }

    async fn set_voice_enabled(&self, chat_id: i64, enabled: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chats (chat_id, voice_enabled) VALUES (?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET voice_enabled = excluded.voice_enabled
            "#,
        )
        .bind(chat_id)
        .bind(enabled as i64)
        .execute(&self.pool)
        .await
        .context("Failed to update voice_enabled")?;
        Ok(())
    }

    async fn set_reply_chance(&self, chat_id: i64, percent: u8) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chats (chat_id, reply_chance) VALUES (?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET reply_chance = excluded.reply_chance
            "#,
        )
        .bind(chat_id)
        .bind(percent.min(100) as i64)
        .execute(&self.pool)
        .await
        .context("Failed to update reply_chance")?;
        Ok(())
    }
}
