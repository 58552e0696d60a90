use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use skein_core::config::ToolsConfig;
use skein_core::error::{Result, SkeinError};
use skein_core::traits::Tool;
use skein_core::types::{ToolDefinition, ToolResult};

use crate::builtin::{GuestInfoTool, HubStatsTool, WeatherTool, WebSearchTool};
use crate::guests::GuestIndex;

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: impl Tool) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions for sending to the LLM, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool by name, bounded by the tool's own timeout.
    pub async fn execute(&self, name: &str, input: serde_json::Value) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| SkeinError::ToolNotFound(name.to_string()))?;

        let timeout = std::time::Duration::from_secs(tool.timeout_secs());

        match tokio::time::timeout(timeout, tool.execute(input)).await {
            Ok(result) => result,
            Err(_) => Err(SkeinError::ToolTimeout {
                tool: name.to_string(),
                timeout_secs: tool.timeout_secs(),
            }),
        }
    }

    /// Create a registry with the gala assistant's built-in tools.
    pub fn with_builtins(config: &ToolsConfig) -> Result<Self> {
        let index = match &config.guests_path {
            Some(path) => GuestIndex::from_file(Path::new(path))?,
            None => GuestIndex::bundled()?,
        };

        let mut registry = Self::new();
        registry.register(GuestInfoTool::new(Arc::new(index)));
        registry.register(WebSearchTool::new(&config.search_url));
        registry.register(WeatherTool);
        registry.register(HubStatsTool::new(&config.hub_url));

        debug!(tools = ?registry.list(), "Tool registry ready");
        Ok(registry)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
