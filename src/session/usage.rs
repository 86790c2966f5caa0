//! Token usage tracking for a session
//!
//! Accumulates what every model request of the session consumed.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::TokenUsage;

/// Tracks token usage across a session
#[derive(Debug, Default)]
pub struct UsageTracker {
    requests: AtomicU64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    cache_read_input_tokens: AtomicU64,
}

impl UsageTracker {
    /// Create a new usage tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Add usage from completed requests
    pub fn add(&self, usage: &TokenUsage) {
        self.requests.fetch_add(usage.requests, Ordering::Relaxed);
        self.input_tokens
            .fetch_add(usage.input_tokens, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(usage.output_tokens, Ordering::Relaxed);
        if let Some(v) = usage.cache_read_input_tokens {
            self.cache_read_input_tokens.fetch_add(v, Ordering::Relaxed);
        }
    }

    /// Get current cumulative usage
    pub fn get(&self) -> TokenUsage {
        let cache_read = self.cache_read_input_tokens.load(Ordering::Relaxed);
        TokenUsage {
            requests: self.requests.load(Ordering::Relaxed),
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            cache_read_input_tokens: (cache_read > 0).then_some(cache_read),
        }
    }

    /// Get total tokens (input + output)
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.load(Ordering::Relaxed) + self.output_tokens.load(Ordering::Relaxed)
    }
}
