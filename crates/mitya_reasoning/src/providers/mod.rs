pub mod mock;
pub mod ollama;

pub use mock::MockModel;
pub use ollama::OllamaClient;
