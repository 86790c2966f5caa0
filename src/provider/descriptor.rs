//! Model client descriptors derived from the environment

use std::fmt;

use crate::types::EnvSource;

use super::ModelProvider;

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434/";
/// Default Ollama model
pub const DEFAULT_OLLAMA_MODEL: &str = "llama4";
/// Default Anthropic endpoint
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
/// Default Claude model
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Variables holding the Claude API key, in priority order
const CLAUDE_KEY_VARS: [&str; 2] = ["CLAUDE_API_KEY", "ANTHROPIC_API_KEY"];

/// How to reach the chosen model
#[derive(Clone, PartialEq, Eq)]
pub enum ModelDescriptor {
    /// OpenAI-compatible endpoint served by Ollama
    Ollama { base_url: String, model: String },
    /// Anthropic Messages API
    Claude {
        base_url: String,
        api_key: String,
        model: String,
    },
}

impl ModelDescriptor {
    /// Build the descriptor for a provider from environment variables
    ///
    /// - Ollama: `OLLAMA_BASE_URL`, `OLLAMA_MODEL`
    /// - Claude: `CLAUDE_API_KEY` (or `ANTHROPIC_API_KEY`), `CLAUDE_MODEL`,
    ///   `ANTHROPIC_BASE_URL`
    ///
    /// Returns `None` only when Claude is chosen and no key is set; the
    /// prerequisite check reports that case before assembly.
    pub fn from_env(provider: ModelProvider, env: &dyn EnvSource) -> Option<Self> {
        match provider {
            ModelProvider::Ollama => {
                let base_url = env
                    .non_empty("OLLAMA_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string());
                Some(ModelDescriptor::Ollama {
                    base_url: normalize_ollama_base_url(&base_url),
                    model: env
                        .non_empty("OLLAMA_MODEL")
                        .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                })
            }
            ModelProvider::Claude => {
                let (_, api_key) = claude_api_key(env)?;
                Some(ModelDescriptor::Claude {
                    base_url: env
                        .non_empty("ANTHROPIC_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
                    api_key,
                    model: env
                        .non_empty("CLAUDE_MODEL")
                        .unwrap_or_else(|| DEFAULT_CLAUDE_MODEL.to_string()),
                })
            }
        }
    }

    /// Provider this descriptor belongs to
    pub fn provider(&self) -> ModelProvider {
        match self {
            ModelDescriptor::Ollama { .. } => ModelProvider::Ollama,
            ModelDescriptor::Claude { .. } => ModelProvider::Claude,
        }
    }

    /// Model name
    pub fn model(&self) -> &str {
        match self {
            ModelDescriptor::Ollama { model, .. } | ModelDescriptor::Claude { model, .. } => model,
        }
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelDescriptor::Ollama { base_url, model } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            ModelDescriptor::Claude {
                base_url, model, ..
            } => f
                .debug_struct("Claude")
                .field("base_url", base_url)
                .field("api_key", &"<redacted>")
                .field("model", model)
                .finish(),
        }
    }
}

/// Find the Claude API key, returning the variable it came from
pub fn claude_api_key(env: &dyn EnvSource) -> Option<(&'static str, String)> {
    CLAUDE_KEY_VARS
        .iter()
        .find_map(|var| env.non_empty(var).map(|value| (*var, value.trim().to_string())))
}

/// Make an Ollama URL point at its OpenAI-compatible `/v1` root
pub fn normalize_ollama_base_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with("/v1") {
        url.to_string()
    } else {
        format!("{}/v1", url.trim_end_matches('/'))
    }
}
