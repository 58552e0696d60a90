use skein_core::types::{ChatMessage, Role};
use skein_graph::State;

/// Conversation held by the assistant loop.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub messages: Vec<ChatMessage>,
}

impl AgentState {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    /// Text of the most recent assistant message.
    pub fn last_answer(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.text())
    }
}

/// Messages to append.
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    pub messages: Vec<ChatMessage>,
}

impl State for AgentState {
    type Update = AgentUpdate;

    fn merge(&mut self, update: AgentUpdate) {
        self.messages.extend(update.messages);
    }
}
