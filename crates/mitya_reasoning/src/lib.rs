pub mod engine;
pub mod llm;
pub mod providers;
pub mod sentiment;

pub use engine::{ConversationEngine, ReplyRequest};
pub use llm::{ChatModel, CompletionParams};
pub use providers::ollama::OllamaClient;
pub use sentiment::SentimentClassifier;
