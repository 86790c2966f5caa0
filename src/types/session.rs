//! Token usage reported by model providers

use serde::{Deserialize, Serialize};

/// Token usage statistics
///
/// Tracks the number of tokens used by one model request, one round, or a
/// whole session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of model requests this usage covers
    pub requests: u64,

    /// Number of input tokens
    pub input_tokens: u64,

    /// Number of output tokens
    pub output_tokens: u64,

    /// Number of tokens read from cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,
}

impl TokenUsage {
    /// Create a new empty token usage
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `usage` object of an Anthropic Messages API response
    pub fn from_anthropic(usage: &serde_json::Value) -> Self {
        Self {
            requests: 1,
            input_tokens: usage["input_tokens"].as_u64().unwrap_or(0),
            output_tokens: usage["output_tokens"].as_u64().unwrap_or(0),
            cache_read_input_tokens: usage["cache_read_input_tokens"].as_u64(),
        }
    }

    /// Parse the `usage` object of an OpenAI-compatible chat completion
    pub fn from_openai(usage: &serde_json::Value) -> Self {
        Self {
            requests: 1,
            input_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0),
            output_tokens: usage["completion_tokens"].as_u64().unwrap_or(0),
            cache_read_input_tokens: None,
        }
    }

    /// Add another usage to this one
    pub fn add(&mut self, other: &TokenUsage) {
        self.requests += other.requests;
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;

        if let Some(v) = other.cache_read_input_tokens {
            *self.cache_read_input_tokens.get_or_insert(0) += v;
        }
    }

    /// Get total token count (input + output)
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Check if any tokens were used
    pub fn is_empty(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0
    }
}

impl std::fmt::Display for TokenUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Usage(requests={}, input_tokens={}, output_tokens={}, total_tokens={})",
            self.requests,
            self.input_tokens,
            self.output_tokens,
            self.total()
        )
    }
}
