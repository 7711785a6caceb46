//! Conversation orchestration: context persistence, reputation-aware
//! prompt assembly, the completion call, and per-chat serialization.

use crate::llm::{ChatModel, CompletionParams};
use mitya_core::{persona, ContextLog, ReputationLedger, Role, Turn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One inbound message for the engine to answer.
#[derive(Debug, Clone, Default)]
pub struct ReplyRequest {
    pub chat_id: i64,
    pub text: String,
    pub user_id: Option<i64>,
    /// When known, the user turn is stored name-prefixed so the model can
    /// tell group members apart.
    pub display_name: Option<String>,
    /// Text of the message this one replies to; spliced into history
    /// right before the new user turn.
    pub reply_context: Option<String>,
    /// Set when the reply is self-initiated rather than requested.
    pub unsolicited: bool,
}

pub struct ConversationEngine {
    context: Arc<dyn ContextLog>,
    reputation: Arc<dyn ReputationLedger>,
    model: Arc<dyn ChatModel>,
    params: CompletionParams,
    lang: String,
    // One handle per chat ever seen; handles are cheap and never evicted.
    chat_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ConversationEngine {
    pub fn new(
        context: Arc<dyn ContextLog>,
        reputation: Arc<dyn ReputationLedger>,
        model: Arc<dyn ChatModel>,
        lang: &str,
        params: CompletionParams,
    ) -> Self {
        Self {
            context,
            reputation,
            model,
            params,
            lang: lang.to_string(),
            chat_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Answer one message. Infallible by contract: storage hiccups are
    /// logged and the turn continues statelessly; a failed or empty
    /// completion yields the fixed fallback phrase.
    pub async fn reply(&self, req: ReplyRequest) -> String {
        // At most one in-flight completion per chat; distinct chats
        // proceed in parallel.
        let lock = self.chat_lock(req.chat_id).await;
        let _serialized = lock.lock().await;

        let user_content = match &req.display_name {
            Some(name) => format!("{}: {}", name, req.text),
            None => req.text.clone(),
        };

        if let Err(e) = self
            .context
            .append(req.chat_id, Turn::new(Role::User, user_content.clone()))
            .await
        {
            tracing::warn!("Failed to persist user turn for chat {}: {}", req.chat_id, e);
        }

        let mut history = match self.context.recent(req.chat_id).await {
            Ok(turns) => turns,
            Err(e) => {
                tracing::warn!("Failed to load context for chat {}: {}", req.chat_id, e);
                Vec::new()
            }
        };
        if history.is_empty() {
            history.push(Turn::new(Role::User, user_content));
        }

        if let Some(quoted) = &req.reply_context {
            let before_user = history.len().saturating_sub(1);
            history.insert(before_user, Turn::new(Role::Assistant, quoted.clone()));
        }

        let score = match req.user_id {
            Some(user_id) => self.reputation.reputation(req.chat_id, user_id).await,
            None => 0,
        };

        let mut system = format!(
            "{}\n{}",
            persona::character(&self.lang),
            persona::attitude_for(score, &self.lang)
        );
        if req.unsolicited {
            system.push(' ');
            system.push_str(persona::unsolicited_directive(&self.lang));
        }
        history.insert(0, Turn::new(Role::System, system));

        match self.model.chat(&history, &self.params).await {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    tracing::warn!("Empty completion for chat {}", req.chat_id);
                    return persona::fallback_reply(&self.lang).to_string();
                }
                if let Err(e) = self
                    .context
                    .append(req.chat_id, Turn::new(Role::Assistant, text.clone()))
                    .await
                {
                    tracing::warn!(
                        "Failed to persist assistant turn for chat {}: {}",
                        req.chat_id,
                        e
                    );
                }
                text
            }
            Err(e) => {
                tracing::warn!("Completion failed for chat {}: {}", req.chat_id, e);
                persona::fallback_reply(&self.lang).to_string()
            }
        }
    }

    /// Get-or-create the serialization handle for a chat. Creation runs
    /// under the table lock, so two first touches of the same chat cannot
    /// both make a handle.
    async fn chat_lock(&self, chat_id: i64) -> Arc<Mutex<()>> {
        let mut table = self.chat_locks.lock().await;
        table
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
