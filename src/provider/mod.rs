//! Model providers
//!
//! A provider turns a provider-neutral conversation into one model response.
//! Two wire formats are supported:
//!
//! - **Claude**: Anthropic Messages API
//! - **Ollama**: OpenAI-compatible chat completions served under `/v1`

mod anthropic;
mod descriptor;
mod http;
mod message;
mod openai;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

pub use anthropic::AnthropicClient;
pub use descriptor::{
    DEFAULT_ANTHROPIC_BASE_URL, DEFAULT_CLAUDE_MODEL, DEFAULT_OLLAMA_BASE_URL,
    DEFAULT_OLLAMA_MODEL, ModelDescriptor, claude_api_key, normalize_ollama_base_url,
};
pub use message::{ChatRequest, ChatTurn, ContentBlock, Message, Role, ToolSchema};
pub use openai::OpenAiCompatClient;

/// Model provider identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelProvider {
    /// Local models served by Ollama
    #[default]
    Ollama,
    /// Anthropic Claude
    Claude,
}

impl ModelProvider {
    /// All supported providers
    pub const ALL: [ModelProvider; 2] = [ModelProvider::Ollama, ModelProvider::Claude];

    /// Identifier used on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            ModelProvider::Ollama => "ollama",
            ModelProvider::Claude => "claude",
        }
    }

    /// Label shown in the interactive wizard
    pub fn label(self) -> &'static str {
        match self {
            ModelProvider::Ollama => "Ollama (local)",
            ModelProvider::Claude => "Claude (Anthropic)",
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(ModelProvider::Ollama),
            "claude" => Ok(ModelProvider::Claude),
            _ => Err(s.to_string()),
        }
    }
}

/// A chat model that can answer a conversation and request tool calls
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider name for logging
    fn provider(&self) -> ModelProvider;

    /// Model name for logging
    fn model(&self) -> &str;

    /// Send the conversation and return the model's next turn
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatTurn, ProviderError>;
}

/// Build the client described by a descriptor
pub fn build_client(descriptor: &ModelDescriptor) -> Result<Box<dyn ChatModel>, ProviderError> {
    match descriptor {
        ModelDescriptor::Ollama { base_url, model } => Ok(Box::new(OpenAiCompatClient::new(
            base_url.clone(),
            model.clone(),
        )?)),
        ModelDescriptor::Claude {
            base_url,
            api_key,
            model,
        } => Ok(Box::new(AnthropicClient::new(
            base_url.clone(),
            api_key.clone(),
            model.clone(),
        )?)),
    }
}

/// Errors from model providers
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Could not build the HTTP client
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// Transport-level failure (connection refused, timeout, ...)
    #[error("request to {url} failed: {error}")]
    Request { url: String, error: String },

    /// The provider answered with a non-success status
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be understood
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("ollama".parse::<ModelProvider>(), Ok(ModelProvider::Ollama));
        assert_eq!(" Claude ".parse::<ModelProvider>(), Ok(ModelProvider::Claude));
        assert_eq!(
            "gpt".parse::<ModelProvider>(),
            Err("gpt".to_string())
        );
    }

    #[test]
    fn test_provider_display_round_trips() {
        for provider in ModelProvider::ALL {
            assert_eq!(provider.to_string().parse::<ModelProvider>(), Ok(provider));
        }
    }

    #[test]
    fn test_build_client_matches_descriptor() {
        let client = build_client(&ModelDescriptor::Ollama {
            base_url: "http://127.0.0.1:11434/v1".to_string(),
            model: "llama4".to_string(),
        })
        .unwrap();
        assert_eq!(client.provider(), ModelProvider::Ollama);
        assert_eq!(client.model(), "llama4");
    }
}
