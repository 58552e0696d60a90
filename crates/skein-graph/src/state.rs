use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// State threaded through a pipeline invocation.
///
/// Nodes never replace the state. They return an `Update` which is merged
/// in, so fields written by earlier nodes survive unless the update names
/// them.
pub trait State: Send + Sync + 'static {
    type Update: Send + 'static;

    fn merge(&mut self, update: Self::Update);
}

/// Open-ended pipeline state: field name to JSON value.
///
/// Its update type is itself; merging inserts or overwrites only the keys
/// present in the update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    data: HashMap<String, serde_json::Value>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for partial updates.
    pub fn with(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Get a value as a string, if it's a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Get a value as a bool, if it's a bool.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }

    /// Set a value.
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Set a string value.
    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data
            .insert(key.into(), serde_json::Value::String(value.into()));
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the underlying data map.
    pub fn data(&self) -> &HashMap<String, serde_json::Value> {
        &self.data
    }
}

impl State for PipelineState {
    type Update = PipelineState;

    fn merge(&mut self, update: PipelineState) {
        self.data.extend(update.data);
    }
}

impl FromIterator<(String, serde_json::Value)> for PipelineState {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_operations() {
        let mut state = PipelineState::new();
        state.set_str("sender", "x@y.com");
        state.set("is_spam", json!(true));

        assert_eq!(state.get_str("sender"), Some("x@y.com"));
        assert_eq!(state.get_bool("is_spam"), Some(true));
        assert_eq!(state.get("missing"), None);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_merge_empty_update_is_noop() {
        let mut state = PipelineState::new().with("a", json!(1)).with("b", json!("two"));
        let before = state.clone();
        state.merge(PipelineState::new());
        assert_eq!(state, before);
    }

    #[test]
    fn test_merge_overwrites_only_named_fields() {
        let mut state = PipelineState::new().with("a", json!(1)).with("b", json!(2));
        state.merge(PipelineState::new().with("b", json!("overwritten")).with("c", json!(3)));

        assert_eq!(state.get("a"), Some(&json!(1)));
        assert_eq!(state.get_str("b"), Some("overwritten"));
        assert_eq!(state.get("c"), Some(&json!(3)));
    }

    #[test]
    fn test_merge_can_write_null() {
        let mut state = PipelineState::new().with("draft_response", json!("hello"));
        state.merge(PipelineState::new().with("draft_response", serde_json::Value::Null));
        assert_eq!(state.get("draft_response"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_from_iter() {
        let state: PipelineState = vec![("topic".to_string(), json!("AI"))].into_iter().collect();
        assert_eq!(state.get_str("topic"), Some("AI"));
    }
}
