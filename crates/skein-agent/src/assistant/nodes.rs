use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use tracing::{debug, error};

use skein_core::config::ModelConfig;
use skein_core::error::Result;
use skein_core::traits::LlmClient;
use skein_core::types::{ChatMessage, ContentBlock, Role, ToolResult};
use skein_graph::{NodeHandler, RouteLabel};
use skein_llm::chat_once;
use skein_tools::ToolRegistry;

use super::state::{AgentState, AgentUpdate};

/// Where the loop goes after the model answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantRoute {
    Tools,
    Done,
}

impl fmt::Display for AssistantRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssistantRoute::Tools => write!(f, "tools"),
            AssistantRoute::Done => write!(f, "done"),
        }
    }
}

impl RouteLabel for AssistantRoute {
    fn variants() -> Option<Vec<Self>> {
        Some(vec![AssistantRoute::Tools, AssistantRoute::Done])
    }
}

/// `Tools` iff the latest message is an assistant turn requesting tools.
pub fn tools_condition(state: &AgentState) -> AssistantRoute {
    match state.messages.last() {
        Some(m) if m.role == Role::Assistant && m.has_tool_uses() => AssistantRoute::Tools,
        _ => AssistantRoute::Done,
    }
}

/// Sends the conversation and the tool definitions to the model.
pub struct AssistantNode {
    pub(crate) llm: Arc<dyn LlmClient>,
    pub(crate) model: ModelConfig,
    pub(crate) system_prompt: String,
    pub(crate) tools: Arc<ToolRegistry>,
}

impl NodeHandler<AgentState> for AssistantNode {
    fn call<'a>(&'a self, state: &'a AgentState) -> BoxFuture<'a, Result<AgentUpdate>> {
        Box::pin(async move {
            let mut messages = Vec::with_capacity(state.messages.len() + 1);
            messages.push(ChatMessage::system(self.system_prompt.clone()));
            messages.extend(state.messages.iter().cloned());

            let definitions = self.tools.definitions();
            let reply = chat_once(self.llm.as_ref(), &self.model, messages, &definitions).await?;

            debug!(
                model = %self.model.model_id,
                text_chars = reply.text.len(),
                tool_calls = reply.tool_calls.len(),
                "Assistant replied"
            );

            Ok(AgentUpdate {
                messages: vec![reply.into_message()],
            })
        })
    }
}

/// Runs every tool call of the latest assistant message concurrently.
///
/// A failing tool becomes an error result the model can read; it never
/// aborts the invocation.
pub struct ToolsNode {
    pub(crate) tools: Arc<ToolRegistry>,
}

impl NodeHandler<AgentState> for ToolsNode {
    fn call<'a>(&'a self, state: &'a AgentState) -> BoxFuture<'a, Result<AgentUpdate>> {
        Box::pin(async move {
            let Some(last) = state.messages.last() else {
                return Ok(AgentUpdate::default());
            };

            let futs: Vec<_> = last
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| {
                    let tools = Arc::clone(&self.tools);
                    let id = id.to_string();
                    let name = name.to_string();
                    let input = input.clone();
                    async move {
                        let start = Instant::now();
                        let result = match tools.execute(&name, input).await {
                            Ok(r) => r,
                            Err(e) => {
                                error!(tool = %name, error = %e, "Tool execution failed");
                                ToolResult::error(e.to_string())
                            }
                        };
                        debug!(
                            tool = %name,
                            is_error = result.is_error,
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "Tool finished"
                        );
                        (id, result)
                    }
                })
                .collect();

            if futs.is_empty() {
                return Ok(AgentUpdate::default());
            }

            let blocks = futures::future::join_all(futs)
                .await
                .into_iter()
                .map(|(id, result)| ContentBlock::ToolResult {
                    tool_use_id: id,
                    content: result.content,
                    is_error: result.is_error,
                })
                .collect();

            Ok(AgentUpdate {
                messages: vec![ChatMessage::tool_results(blocks)],
            })
        })
    }
}
