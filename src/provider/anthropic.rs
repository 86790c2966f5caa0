//! Anthropic Messages API client

use async_trait::async_trait;
use serde_json::{Value, json};

use super::http::{build_http_client, post_json};
use super::{ChatModel, ChatRequest, ChatTurn, ContentBlock, ModelProvider, ProviderError};
use crate::types::TokenUsage;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// Client for Claude models
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    /// Create a client for the given endpoint and model
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_http_client()?,
            base_url,
            api_key,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for AnthropicClient {
    fn provider(&self) -> ModelProvider {
        ModelProvider::Claude
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatTurn, ProviderError> {
        let url = self.endpoint();
        let body = build_request_body(&self.model, &request)?;
        let builder = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);

        let response = post_json(builder, &url, &body).await?;
        parse_response(&response)
    }
}

/// Build the Messages API request body
fn build_request_body(model: &str, request: &ChatRequest<'_>) -> Result<Value, ProviderError> {
    let messages = serde_json::to_value(request.messages)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    let mut body = json!({
        "model": model,
        "max_tokens": MAX_TOKENS,
        "messages": messages,
    });

    if let Some(system) = request.system {
        body["system"] = json!(system);
    }

    if !request.tools.is_empty() {
        body["tools"] = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.input_schema,
                })
            })
            .collect();
    }

    Ok(body)
}

/// Parse a Messages API response into a turn
fn parse_response(response: &Value) -> Result<ChatTurn, ProviderError> {
    let blocks = response["content"]
        .as_array()
        .ok_or_else(|| ProviderError::InvalidResponse("missing `content` array".to_string()))?;

    let content = blocks
        .iter()
        .filter_map(|block| match block["type"].as_str() {
            Some("text") => block["text"].as_str().map(ContentBlock::text),
            Some("tool_use") => Some(ContentBlock::ToolUse {
                id: block["id"].as_str().unwrap_or_default().to_string(),
                name: block["name"].as_str().unwrap_or_default().to_string(),
                input: block.get("input").cloned().unwrap_or_else(|| json!({})),
            }),
            other => {
                tracing::trace!(block_type = ?other, "Skipping content block");
                None
            }
        })
        .collect();

    Ok(ChatTurn {
        content,
        usage: TokenUsage::from_anthropic(&response["usage"]),
        stop_reason: response["stop_reason"].as_str().map(String::from),
    })
}
