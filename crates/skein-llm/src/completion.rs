use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tracing::debug;

use skein_core::config::ModelConfig;
use skein_core::error::{Result, SkeinError};
use skein_core::traits::{Completion, LlmClient};
use skein_core::types::{ChatMessage, ToolDefinition};

use crate::collect::{collect_reply, AssistantReply};

/// Send one chat request and collect the full reply, bounded by
/// `config.timeout_secs` (connection and streamed body together).
pub async fn chat_once(
    llm: &dyn LlmClient,
    config: &ModelConfig,
    messages: Vec<ChatMessage>,
    tools: &[ToolDefinition],
) -> Result<AssistantReply> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let request = async {
        let stream = llm.chat_stream(config, messages, tools).await?;
        collect_reply(stream).await
    };

    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(SkeinError::LlmTimeout(config.timeout_secs)),
    }
}

/// Completion boundary backed by a chat model.
///
/// Each prompt is sent as a single user message (after the optional system
/// prompt); the reply text is returned.
pub struct ChatCompletion {
    llm: Arc<dyn LlmClient>,
    config: ModelConfig,
    system_prompt: Option<String>,
}

impl ChatCompletion {
    pub fn new(llm: Arc<dyn LlmClient>, config: ModelConfig) -> Self {
        Self {
            llm,
            config,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

impl Completion for ChatCompletion {
    fn complete(&self, prompt: String) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let start = Instant::now();
            let prompt_chars = prompt.len();

            let mut messages = Vec::with_capacity(2);
            if let Some(system) = &self.system_prompt {
                messages.push(ChatMessage::system(system.clone()));
            }
            messages.push(ChatMessage::user(prompt));

            let reply = chat_once(self.llm.as_ref(), &self.config, messages, &[]).await?;

            debug!(
                model = %self.config.model_id,
                prompt_chars,
                response_chars = reply.text.len(),
                output_tokens = reply.output_tokens,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Completion finished"
            );
            Ok(reply.text)
        })
    }
}
