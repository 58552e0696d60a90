use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkeinError {
    // Pipeline errors
    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("Node '{node}' returned unknown route label '{label}'")]
    UnknownRouteLabel { node: String, label: String },

    #[error("Node '{node}' failed: {source}")]
    Handler {
        node: String,
        source: Box<SkeinError>,
    },

    #[error("Pipeline exceeded step limit ({0})")]
    StepLimitExceeded(usize),

    #[error("Invocation cancelled")]
    Cancelled,

    #[error("Task failed: {0}")]
    Task(String),

    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM streaming error: {0}")]
    LlmStream(String),

    #[error("LLM request timed out after {0}s")]
    LlmTimeout(u64),

    #[error("LLM response parse error: {0}")]
    LlmParse(String),

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {tool}: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Tool timeout after {timeout_secs}s: {tool}")]
    ToolTimeout { tool: String, timeout_secs: u64 },

    #[error("Tool input validation failed: {0}")]
    ToolValidation(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SkeinError {
    /// Wrap an error raised inside a pipeline node.
    pub fn handler(node: impl Into<String>, source: SkeinError) -> Self {
        Self::Handler {
            node: node.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, unwrapping any `Handler` layers.
    pub fn root_cause(&self) -> &SkeinError {
        match self {
            Self::Handler { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, SkeinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_display_includes_node_and_cause() {
        let err = SkeinError::handler("classify_email", SkeinError::LlmTimeout(30));
        assert_eq!(
            err.to_string(),
            "Node 'classify_email' failed: LLM request timed out after 30s"
        );
    }

    #[test]
    fn test_root_cause_unwraps_nested_handlers() {
        let inner = SkeinError::handler("b", SkeinError::ToolNotFound("x".into()));
        let outer = SkeinError::handler("a", inner);
        assert!(matches!(outer.root_cause(), SkeinError::ToolNotFound(name) if name == "x"));
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;
        let err = SkeinError::handler("n", SkeinError::Cancelled);
        let source = err.source().expect("handler error has a source");
        assert_eq!(source.to_string(), "Invocation cancelled");
    }
}
