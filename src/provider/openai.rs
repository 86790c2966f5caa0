//! OpenAI-compatible chat completions client (used for Ollama)

use async_trait::async_trait;
use serde_json::{Value, json};

use super::http::{build_http_client, post_json};
use super::{
    ChatModel, ChatRequest, ChatTurn, ContentBlock, Message, ModelProvider, ProviderError, Role,
};
use crate::types::TokenUsage;

/// Client for any `/v1/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OpenAiCompatClient {
    /// Create a client; `base_url` should already end in `/v1`
    pub fn new(base_url: String, model: String) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_http_client()?,
            base_url,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    fn provider(&self) -> ModelProvider {
        ModelProvider::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatTurn, ProviderError> {
        let url = self.endpoint();
        let body = build_request_body(&self.model, &request);
        let response = post_json(self.http.post(&url), &url, &body).await?;
        parse_response(&response)
    }
}

/// Flatten the conversation into chat-completion messages
///
/// Tool results travel as separate `tool` role messages keyed by call id.
fn to_wire_messages(system: Option<&str>, messages: &[Message]) -> Vec<Value> {
    let mut wire = Vec::with_capacity(messages.len() + 1);

    if let Some(system) = system {
        wire.push(json!({"role": "system", "content": system}));
    }

    for message in messages {
        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();

        for block in &message.content {
            match block {
                ContentBlock::Text { text } => texts.push(text.as_str()),
                ContentBlock::ToolUse { id, name, input } => tool_calls.push(json!({
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": input.to_string()},
                })),
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } => wire.push(json!({
                    "role": "tool",
                    "tool_call_id": tool_use_id,
                    "content": content,
                })),
            }
        }

        match message.role {
            Role::User => {
                if !texts.is_empty() {
                    wire.push(json!({"role": "user", "content": texts.join("\n")}));
                }
            }
            Role::Assistant => {
                let text = if texts.is_empty() {
                    Value::Null
                } else {
                    Value::String(texts.join("\n"))
                };
                let mut entry = json!({"role": "assistant", "content": text});
                if !tool_calls.is_empty() {
                    entry["tool_calls"] = Value::Array(tool_calls);
                }
                wire.push(entry);
            }
        }
    }

    wire
}

fn build_request_body(model: &str, request: &ChatRequest<'_>) -> Value {
    let mut body = json!({
        "model": model,
        "messages": to_wire_messages(request.system, request.messages),
        "stream": false,
    });

    if !request.tools.is_empty() {
        body["tools"] = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.input_schema,
                    }
                })
            })
            .collect();
    }

    body
}

/// Tool arguments arrive as a JSON string; some servers send an object
fn parse_arguments(raw: &Value) -> Value {
    match raw {
        Value::String(text) if text.trim().is_empty() => json!({}),
        Value::String(text) => serde_json::from_str(text).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Tool arguments are not valid JSON, passing as raw string");
            json!({ "input": text })
        }),
        Value::Null => json!({}),
        other => other.clone(),
    }
}

fn parse_response(response: &Value) -> Result<ChatTurn, ProviderError> {
    let choice = response["choices"]
        .get(0)
        .ok_or_else(|| ProviderError::InvalidResponse("missing `choices[0]`".to_string()))?;
    let message = &choice["message"];

    let mut content = Vec::new();
    if let Some(text) = message["content"].as_str().filter(|t| !t.is_empty()) {
        content.push(ContentBlock::text(text));
    }

    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let id = call["id"]
                .as_str()
                .filter(|id| !id.is_empty())
                .map(String::from)
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
            content.push(ContentBlock::ToolUse {
                id,
                name: call["function"]["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
                input: parse_arguments(&call["function"]["arguments"]),
            });
        }
    }

    Ok(ChatTurn {
        content,
        usage: TokenUsage::from_openai(&response["usage"]),
        stop_reason: choice["finish_reason"].as_str().map(String::from),
    })
}
