use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SkeinError};

/// Top-level skein configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub triage: TriageConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Model endpoint configuration for the completion boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Full chat-completions URL. Defaults depend on the provider.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Whole-request timeout, including the streamed body.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_id: default_model_id(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            retry: None,
            extra_headers: HashMap::new(),
        }
    }
}

fn default_provider() -> String { "ollama".to_string() }
fn default_model_id() -> String { "llama3.2:1b".to_string() }
fn default_max_tokens() -> u32 { 2048 }
fn default_temperature() -> f32 { 0.0 }
fn default_timeout_secs() -> u64 { 300 }

/// Retry configuration for LLM requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 30000 }

/// Executor limits shared by every pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum handler runs per invocation.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

fn default_max_steps() -> usize { 25 }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub model: Option<ModelConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub model: Option<ModelConfig>,
    /// Overrides `pipeline.max_steps` for the tool-calling loop.
    #[serde(default)]
    pub max_steps: Option<usize>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub model: Option<ModelConfig>,
    /// Name of the mailbox owner, used in prompts.
    #[serde(default = "default_username")]
    pub username: String,
    /// One-line description of the owner given to the classifier.
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Concurrent invocations in batch mode.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            model: None,
            username: default_username(),
            profile: default_profile(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_username() -> String { "Bob".to_string() }
fn default_profile() -> String {
    "is a Software Engineer who subscribes to newsletters and social networks.".to_string()
}
fn default_concurrency() -> usize { 4 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_hub_url")]
    pub hub_url: String,
    /// JSON file with the invitee list. Uses the bundled list when unset.
    #[serde(default)]
    pub guests_path: Option<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            hub_url: default_hub_url(),
            guests_path: None,
        }
    }
}

fn default_search_url() -> String { "https://api.duckduckgo.com/".to_string() }
fn default_hub_url() -> String { "https://huggingface.co/api/models".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Time cancelled tasks get to wind down before they are aborted.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            grace_ms: default_grace_ms(),
        }
    }
}

fn default_interval_ms() -> u64 { 500 }
fn default_grace_ms() -> u64 { 500 }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SkeinError::ConfigNotFound(path.display().to_string()),
            _ => SkeinError::Io(e),
        })?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        let config: Self =
            toml::from_str(&expanded).map_err(|e| SkeinError::Config(e.to_string()))?;
        debug!(path = %path.display(), model = %config.model.model_id, "Config loaded");
        Ok(config)
    }

    /// Load config, falling back to defaults only when the file does not
    /// exist. An unreadable file is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(SkeinError::ConfigNotFound(p)) => {
                info!(path = %p, "No config file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn chat_model(&self) -> &ModelConfig {
        self.chat.model.as_ref().unwrap_or(&self.model)
    }

    pub fn assistant_model(&self) -> &ModelConfig {
        self.assistant.model.as_ref().unwrap_or(&self.model)
    }

    pub fn triage_model(&self) -> &ModelConfig {
        self.triage.model.as_ref().unwrap_or(&self.model)
    }

    pub fn assistant_max_steps(&self) -> usize {
        self.assistant.max_steps.unwrap_or(self.pipeline.max_steps)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Keep original if env var not set
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}
