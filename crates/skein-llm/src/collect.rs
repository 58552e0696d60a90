use futures::stream::{BoxStream, StreamExt};
use tracing::warn;

use skein_core::error::Result;
use skein_core::types::*;

/// A tool call assembled from streamed deltas.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// A complete assistant reply assembled from a delta stream.
#[derive(Debug, Clone, Default)]
pub struct AssistantReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: Option<StopReason>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl AssistantReply {
    /// Convert into an assistant chat message.
    pub fn into_message(self) -> ChatMessage {
        let mut content = Vec::new();
        if !self.text.is_empty() {
            content.push(ContentBlock::Text { text: self.text });
        }
        for call in self.tool_calls {
            content.push(ContentBlock::ToolUse {
                id: call.id,
                name: call.name,
                input: call.input,
            });
        }
        ChatMessage {
            role: Role::Assistant,
            content,
            timestamp: Some(chrono::Utc::now()),
        }
    }
}

#[derive(Debug, Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    input_json: String,
}

/// Drain a delta stream into a reply.
///
/// Tool calls missing an id get a generated one so results can be matched
/// back. Unparseable arguments become `null` rather than failing the reply.
pub async fn collect_reply(mut stream: BoxStream<'_, Result<StreamDelta>>) -> Result<AssistantReply> {
    let mut reply = AssistantReply::default();
    let mut calls: Vec<ToolCallAccumulator> = Vec::new();

    while let Some(delta) = stream.next().await {
        match delta? {
            StreamDelta::TextDelta(text) => reply.text.push_str(&text),
            StreamDelta::ToolUseStart { index, id, name } => {
                while calls.len() <= index {
                    calls.push(ToolCallAccumulator::default());
                }
                calls[index].id = id;
                calls[index].name = name;
            }
            StreamDelta::ToolInputDelta { index, delta } => {
                if let Some(call) = calls.get_mut(index) {
                    call.input_json.push_str(&delta);
                }
            }
            StreamDelta::Stop(reason) => reply.stop_reason = Some(reason),
            StreamDelta::Usage {
                input_tokens,
                output_tokens,
            } => {
                reply.input_tokens += input_tokens;
                reply.output_tokens += output_tokens;
            }
        }
    }

    reply.tool_calls = calls
        .into_iter()
        .filter(|c| !c.name.is_empty())
        .map(|c| {
            let input = if c.input_json.trim().is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&c.input_json).unwrap_or_else(|e| {
                    warn!(tool = %c.name, error = %e, "Tool call arguments are not valid JSON");
                    serde_json::Value::Null
                })
            };
            let id = if c.id.is_empty() {
                format!("call_{}", uuid::Uuid::new_v4().simple())
            } else {
                c.id
            };
            ToolCall {
                id,
                name: c.name,
                input,
            }
        })
        .collect();

    Ok(reply)
}
