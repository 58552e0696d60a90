//! Tool-calling assistant: `assistant -> {tools: tools, done: END}`,
//! `tools -> assistant`, bounded by the pipeline step limit.

pub mod nodes;
pub mod state;

use std::sync::Arc;

use tracing::info;

use skein_core::config::ModelConfig;
use skein_core::error::Result;
use skein_core::traits::LlmClient;
use skein_core::types::ChatMessage;
use skein_graph::{Pipeline, END};
use skein_tools::ToolRegistry;

pub use nodes::{tools_condition, AssistantNode, AssistantRoute, ToolsNode};
pub use state::{AgentState, AgentUpdate};

pub const ASSISTANT: &str = "assistant";
pub const TOOLS: &str = "tools";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Alfred, a discreet and helpful butler preparing a gala. \
Use the available tools to look up guests, check the weather, search the web and read model hub \
statistics whenever they help. Answer concisely.";

/// An answer plus the conversation that produced it.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Full history including the question, tool traffic and the answer.
    /// Pass it to the next `ask` to continue the conversation.
    pub history: Vec<ChatMessage>,
}

pub struct Assistant {
    pipeline: Pipeline<AgentState>,
}

impl Assistant {
    pub fn new(llm: Arc<dyn LlmClient>, model: ModelConfig, tools: Arc<ToolRegistry>) -> Result<Self> {
        Self::with_options(
            llm,
            model,
            tools,
            DEFAULT_SYSTEM_PROMPT,
            skein_graph::executor::DEFAULT_MAX_STEPS,
        )
    }

    pub fn with_options(
        llm: Arc<dyn LlmClient>,
        model: ModelConfig,
        tools: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
        max_steps: usize,
    ) -> Result<Self> {
        let pipeline = Pipeline::<AgentState>::builder()
            .add_node(
                ASSISTANT,
                AssistantNode {
                    llm,
                    model,
                    system_prompt: system_prompt.into(),
                    tools: tools.clone(),
                },
            )
            .add_node(TOOLS, ToolsNode { tools })
            .set_entry(ASSISTANT)
            .add_conditional_edges(
                ASSISTANT,
                tools_condition,
                [(AssistantRoute::Tools, TOOLS), (AssistantRoute::Done, END)],
            )
            .add_edge(TOOLS, ASSISTANT)
            .max_steps(max_steps)
            .build()?;
        Ok(Self { pipeline })
    }

    pub fn pipeline(&self) -> &Pipeline<AgentState> {
        &self.pipeline
    }

    /// Ask a question on top of an earlier conversation (empty for a fresh
    /// one).
    pub async fn ask(&self, history: Vec<ChatMessage>, question: impl Into<String>) -> Result<Answer> {
        let mut messages = history;
        messages.push(ChatMessage::user(question));
        let before = messages.len();

        let state = self.pipeline.invoke(AgentState::new(messages)).await?;
        let text = state.last_answer().unwrap_or_default();

        info!(
            added_messages = state.messages.len() - before,
            answer_chars = text.len(),
            "Question answered"
        );

        Ok(Answer {
            text,
            history: state.messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use skein_core::error::SkeinError;
    use skein_core::traits::Tool;
    use skein_core::types::{ContentBlock, Role, ToolResult};
    use skein_test_utils::MockLlmClient;

    struct GuestStub;

    impl Tool for GuestStub {
        fn name(&self) -> &str {
            "guest_info_retriever"
        }
        fn description(&self) -> &str {
            "Guest lookup."
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}}})
        }
        fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
            Box::pin(async move {
                Ok(ToolResult::success(format!(
                    "Name: {}\nRelation: best friend",
                    input["query"].as_str().unwrap_or("?")
                )))
            })
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(GuestStub);
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_tool_round_trip_then_answer() {
        let llm = Arc::new(
            MockLlmClient::new()
                .with_tool_call(
                    "call_1",
                    "guest_info_retriever",
                    serde_json::json!({"query": "Ada Lovelace"}),
                )
                .with_text_reply("Ada Lovelace is your best friend."),
        );
        let assistant = Assistant::new(llm.clone(), ModelConfig::default(), registry()).unwrap();

        let answer = assistant
            .ask(vec![], "Tell me about 'Lady Ada Lovelace'")
            .await
            .unwrap();

        assert_eq!(answer.text, "Ada Lovelace is your best friend.");
        // user, assistant(tool call), tool result, assistant(answer)
        assert_eq!(answer.history.len(), 4);
        assert_eq!(answer.history[2].role, Role::Tool);

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0][0].role, Role::System);
        assert_eq!(llm.offered_tools()[0], vec!["guest_info_retriever".to_string()]);
        match &requests[1].last().unwrap().content[0] {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                assert_eq!(tool_use_id, "call_1");
                assert!(content.starts_with("Name: Ada Lovelace"));
                assert!(!is_error);
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_follow_up_sees_history() {
        let llm = Arc::new(
            MockLlmClient::new()
                .with_text_reply("She is a mathematician.")
                .with_text_reply("She works on the Analytical Engine."),
        );
        let assistant = Assistant::new(llm.clone(), ModelConfig::default(), registry()).unwrap();

        let first = assistant
            .ask(vec![], "Tell me about 'Lady Ada Lovelace'.")
            .await
            .unwrap();
        let second = assistant
            .ask(first.history, "What projects is she currently working on?")
            .await
            .unwrap();

        assert_eq!(second.text, "She works on the Analytical Engine.");
        assert_eq!(second.history.len(), 4);

        let sent = &llm.requests()[1];
        let texts: Vec<String> = sent.iter().map(|m| m.text()).collect();
        assert!(texts.contains(&"Tell me about 'Lady Ada Lovelace'.".to_string()));
        assert!(texts.contains(&"She is a mathematician.".to_string()));
    }

    #[tokio::test]
    async fn test_endless_tool_calls_hit_step_limit() {
        let mut llm = MockLlmClient::new();
        for i in 0..5 {
            llm = llm.with_tool_call(
                format!("call_{}", i),
                "guest_info_retriever",
                serde_json::json!({"query": "Tesla"}),
            );
        }
        let assistant = Assistant::with_options(
            Arc::new(llm),
            ModelConfig::default(),
            registry(),
            "test",
            4,
        )
        .unwrap();

        let result = assistant.ask(vec![], "loop forever").await;
        assert!(matches!(result, Err(SkeinError::StepLimitExceeded(4))));
    }

    #[tokio::test]
    async fn test_llm_failure_names_assistant_node() {
        let llm = Arc::new(MockLlmClient::new().with_error("HTTP 404: model not found"));
        let assistant = Assistant::new(llm, ModelConfig::default(), registry()).unwrap();

        let err = assistant.ask(vec![], "hello").await.unwrap_err();
        assert!(matches!(err, SkeinError::Handler { ref node, .. } if node == ASSISTANT));
    }
}
