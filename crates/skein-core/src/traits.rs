use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::config::ModelConfig;
use crate::error::Result;
use crate::types::*;

/// Streaming chat completion client with optional tools.
pub trait LlmClient: Send + Sync + 'static {
    /// Send a chat request and receive a stream of deltas.
    fn chat_stream(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>>;
}

/// Completion boundary: prompt text in, response text out.
///
/// This is the only point where pipeline handlers reach the model backend.
/// Implementations own their timeout and retry policy.
pub trait Completion: Send + Sync + 'static {
    fn complete(&self, prompt: String) -> BoxFuture<'_, Result<String>>;
}

/// A tool callable by the assistant loop.
pub trait Tool: Send + Sync + 'static {
    /// Tool name (used in LLM tool calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema for tool input.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given input.
    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>>;

    /// Timeout in seconds for this tool.
    fn timeout_secs(&self) -> u64 {
        30
    }
}

/// Sink for user-facing notices emitted by pipeline nodes.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notice: Notice);
}

/// Notifier that prints to stdout.
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Info(line) => println!("{}", line),
            Notice::Report { title, body } => {
                println!("\n{}", "=".repeat(50));
                println!("{}", title);
                for line in body {
                    println!("{}", line);
                }
                println!("{}\n", "=".repeat(50));
            }
        }
    }
}
