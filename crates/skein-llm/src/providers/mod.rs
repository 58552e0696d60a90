pub mod openai;

pub use openai::OpenAiClient;

use skein_core::config::ModelConfig;
use skein_core::error::{Result, SkeinError};

/// Default chat-completions URL for a known OpenAI-compatible provider.
pub fn default_base_url(provider: &str) -> Option<&'static str> {
    match provider {
        "ollama" => Some("http://localhost:11434/v1/chat/completions"),
        "openai" => Some("https://api.openai.com/v1/chat/completions"),
        "groq" => Some("https://api.groq.com/openai/v1/chat/completions"),
        "openrouter" => Some("https://openrouter.ai/api/v1/chat/completions"),
        "together" => Some("https://api.together.xyz/v1/chat/completions"),
        _ => None,
    }
}

/// The URL a request for `config` is sent to. An explicit `base_url` wins.
pub fn resolve_endpoint(config: &ModelConfig) -> Result<String> {
    if let Some(url) = &config.base_url {
        return Ok(url.clone());
    }
    default_base_url(&config.provider)
        .map(str::to_string)
        .ok_or_else(|| {
            SkeinError::Config(format!(
                "provider '{}' has no default endpoint; set model.base_url",
                config.provider
            ))
        })
}
