//! Shared HTTP plumbing for providers

use std::time::Duration;

use serde_json::Value;

use super::ProviderError;

/// Upper bound for a single completion request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) fn build_http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(concat!("mcp-assistant/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::ClientBuild(e.to_string()))
}

/// POST a JSON body and return the parsed JSON response
pub(super) async fn post_json(
    request: reqwest::RequestBuilder,
    url: &str,
    body: &Value,
) -> Result<Value, ProviderError> {
    let started = std::time::Instant::now();
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| ProviderError::Request {
            url: url.to_string(),
            error: e.to_string(),
        })?;

    let status = response.status();
    let text = response.text().await.map_err(|e| ProviderError::Request {
        url: url.to_string(),
        error: e.to_string(),
    })?;

    tracing::debug!(
        url = %url,
        status = status.as_u16(),
        elapsed_ms = started.elapsed().as_millis(),
        body_len = text.len(),
        "Provider responded"
    );

    if !status.is_success() {
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message: api_error_message(&text),
        });
    }

    serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// Pull a readable message out of a provider error body
///
/// Understands `{"error": {"message": ..}}` (Anthropic, OpenAI) and
/// `{"error": ".."}` (Ollama); anything else is returned as-is.
pub(super) fn api_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    match &value["error"] {
        Value::String(message) => message.clone(),
        Value::Object(error) => error
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| value["error"].to_string()),
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_shapes() {
        assert_eq!(
            api_error_message(
                r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#
            ),
            "invalid x-api-key"
        );
        assert_eq!(
            api_error_message(r#"{"error":"model 'llama4' not found"}"#),
            "model 'llama4' not found"
        );
        assert_eq!(api_error_message("Bad Gateway\n"), "Bad Gateway");
    }
}
