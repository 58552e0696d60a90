pub mod collect;
pub mod completion;
pub mod providers;
pub mod retry;
pub mod streaming;

use std::sync::Arc;

use skein_core::config::ModelConfig;
use skein_core::traits::{Completion, LlmClient};

pub use collect::{collect_reply, AssistantReply, ToolCall};
pub use completion::{chat_once, ChatCompletion};
pub use providers::OpenAiClient;
pub use retry::RetryingClient;

/// Create an LLM client for the configured provider, with retries when
/// `config.retry` is set.
pub fn create_client(config: &ModelConfig) -> Arc<dyn LlmClient> {
    // Every supported provider speaks the OpenAI-compatible protocol
    let client: Box<dyn LlmClient> = Box::new(OpenAiClient::new());
    match &config.retry {
        Some(retry) => Arc::new(RetryingClient::new(client, retry.clone())),
        None => Arc::from(client),
    }
}

/// Create a completion boundary for the configured model.
pub fn create_completion(config: &ModelConfig) -> Arc<dyn Completion> {
    Arc::new(ChatCompletion::new(create_client(config), config.clone()))
}
