use std::collections::VecDeque;
use std::sync::Mutex;

use futures::future::BoxFuture;
use futures::stream::BoxStream;

use skein_core::config::ModelConfig;
use skein_core::error::{Result, SkeinError};
use skein_core::traits::LlmClient;
use skein_core::types::*;

use crate::lock;

enum Script {
    Deltas(Vec<StreamDelta>),
    Error(String),
    Stall,
}

/// Streaming LLM client that plays back one scripted reply per call.
///
/// Requests (the messages and the offered tool names) are recorded for
/// assertions.
#[derive(Default)]
pub struct MockLlmClient {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    offered_tools: Mutex<Vec<Vec<String>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, script: Script) -> Self {
        lock(&self.scripts).push_back(script);
        self
    }

    /// Queue a raw delta sequence.
    pub fn with_reply(self, deltas: Vec<StreamDelta>) -> Self {
        self.push(Script::Deltas(deltas))
    }

    /// Queue a plain text reply.
    pub fn with_text_reply(self, text: impl Into<String>) -> Self {
        self.with_reply(vec![
            StreamDelta::TextDelta(text.into()),
            StreamDelta::Stop(StopReason::EndTurn),
        ])
    }

    /// Queue a reply requesting a single tool call.
    pub fn with_tool_call(
        self,
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        self.with_reply(vec![
            StreamDelta::ToolUseStart {
                index: 0,
                id: id.into(),
                name: name.into(),
            },
            StreamDelta::ToolInputDelta {
                index: 0,
                delta: input.to_string(),
            },
            StreamDelta::Stop(StopReason::ToolUse),
        ])
    }

    /// Queue a request failure.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Script::Error(message.into()))
    }

    /// Queue a call that never returns.
    pub fn with_stall(self) -> Self {
        self.push(Script::Stall)
    }

    /// Messages sent on each call, in order.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        lock(&self.requests).clone()
    }

    /// Tool names offered on each call, in order.
    pub fn offered_tools(&self) -> Vec<Vec<String>> {
        lock(&self.offered_tools).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

impl LlmClient for MockLlmClient {
    fn chat_stream(
        &self,
        _config: &ModelConfig,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>> {
        lock(&self.requests).push(messages);
        lock(&self.offered_tools).push(tools.iter().map(|t| t.name.clone()).collect());
        let script = lock(&self.scripts).pop_front();

        Box::pin(async move {
            match script {
                Some(Script::Deltas(deltas)) => {
                    let items: Vec<Result<StreamDelta>> = deltas.into_iter().map(Ok).collect();
                    Ok(Box::pin(futures::stream::iter(items)) as BoxStream<'_, _>)
                }
                Some(Script::Error(message)) => Err(SkeinError::LlmRequest(message)),
                Some(Script::Stall) => std::future::pending().await,
                None => Err(SkeinError::LlmRequest("mock LLM script exhausted".into())),
            }
        })
    }
}
