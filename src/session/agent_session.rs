//! A running agent session
//!
//! Binds one model client to the MCP servers of the session and keeps the
//! conversation history across rounds.

use serde_json::Value;

use crate::mcp::{McpManager, ToolResult};
use crate::provider::{ChatModel, ChatRequest, ContentBlock, Message, ToolSchema, build_client};
use crate::types::{AppError, Result, TokenUsage};

use super::assembler::SessionPlan;
use super::usage::UsageTracker;

/// Model calls allowed in one round before giving up
pub const MAX_MODEL_CALLS_PER_ROUND: usize = 25;

/// Answer of one round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundOutput {
    /// Final text of the model
    pub text: String,
    /// Usage of every model call made in the round
    pub usage: TokenUsage,
}

/// An active session
pub struct AgentSession {
    /// Unique session identifier
    pub session_id: String,
    mcp: McpManager,
    model: Box<dyn ChatModel>,
    system_prompt: String,
    tools: Vec<ToolSchema>,
    history: Vec<Message>,
    usage: UsageTracker,
    max_model_calls: usize,
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("session_id", &self.session_id)
            .field("provider", &self.model.provider())
            .field("model", &self.model.model())
            .field("servers", &self.mcp.server_names())
            .field("tools", &self.tools.len())
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl AgentSession {
    /// Start a session from a plan
    ///
    /// The model client is built first so a bad client configuration never
    /// leaves server processes behind.
    pub async fn start(plan: &SessionPlan) -> Result<Self> {
        let model = build_client(&plan.model)?;
        let mcp = McpManager::connect_all(&plan.servers).await?;
        Ok(Self::new(mcp, model, plan.system_prompt.clone()))
    }

    /// Create a session over already-connected servers
    pub fn new(mcp: McpManager, model: Box<dyn ChatModel>, system_prompt: String) -> Self {
        let tools = mcp.all_tools();
        let session_id = uuid::Uuid::new_v4().to_string();

        tracing::info!(
            session_id = %session_id,
            provider = %model.provider(),
            model = %model.model(),
            servers = ?mcp.server_names(),
            tool_count = tools.len(),
            "Agent session started"
        );

        Self {
            session_id,
            mcp,
            model,
            system_prompt,
            tools,
            history: Vec::new(),
            usage: UsageTracker::new(),
            max_model_calls: MAX_MODEL_CALLS_PER_ROUND,
        }
    }

    /// Override the per-round model call limit
    pub fn with_max_model_calls(mut self, max: usize) -> Self {
        self.max_model_calls = max;
        self
    }

    /// Tools offered to the model
    pub fn tools(&self) -> &[ToolSchema] {
        &self.tools
    }

    /// Conversation so far
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Usage of the whole session
    pub fn usage(&self) -> TokenUsage {
        self.usage.get()
    }

    /// Run one round: send `input`, execute tool calls until the model
    /// answers with text
    ///
    /// On error the history is rolled back to where the round started.
    pub async fn run_round(&mut self, input: &str) -> Result<RoundOutput> {
        let checkpoint = self.history.len();
        let result = self.run_round_inner(input).await;
        if result.is_err() {
            self.history.truncate(checkpoint);
        }
        result
    }

    async fn run_round_inner(&mut self, input: &str) -> Result<RoundOutput> {
        self.history.push(Message::user_text(input));
        let mut round_usage = TokenUsage::new();

        for step in 1..=self.max_model_calls {
            let request = ChatRequest {
                system: Some(self.system_prompt.as_str()),
                messages: &self.history,
                tools: &self.tools,
            };
            let turn = self.model.complete(request).await?;

            self.usage.add(&turn.usage);
            round_usage.add(&turn.usage);

            let calls: Vec<(String, String, Value)> = turn
                .tool_calls()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();
            let text = turn.text();
            self.history.push(Message::assistant(turn.content));

            if calls.is_empty() {
                tracing::debug!(
                    session_id = %self.session_id,
                    steps = step,
                    usage = %round_usage,
                    "Round complete"
                );
                return Ok(RoundOutput {
                    text,
                    usage: round_usage,
                });
            }

            let mut results = Vec::with_capacity(calls.len());
            for (id, name, arguments) in calls {
                let result = self.execute_tool(&name, arguments).await?;
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id,
                    content: result.content,
                    is_error: result.is_error,
                });
            }
            self.history.push(Message::tool_results(results));
        }

        tracing::warn!(
            session_id = %self.session_id,
            limit = self.max_model_calls,
            "Model did not finish the round"
        );
        Err(AppError::ToolStepLimit(self.max_model_calls))
    }

    /// Run one tool call; routing problems go back to the model as errors
    async fn execute_tool(&mut self, name: &str, arguments: Value) -> Result<ToolResult> {
        let start_time = std::time::Instant::now();
        match self.mcp.call_tool(name, arguments).await {
            Ok(result) => {
                tracing::debug!(
                    tool = %name,
                    is_error = result.is_error,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    "Tool call finished"
                );
                Ok(result)
            }
            Err(e) if e.is_routing_error() => {
                tracing::warn!(tool = %name, error = %e, "Model requested an unknown tool");
                Ok(ToolResult::error(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stop every server of the session
    pub async fn shutdown(&mut self) {
        tracing::info!(
            session_id = %self.session_id,
            usage = %self.usage.get(),
            "Shutting down agent session"
        );
        self.mcp.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::fake_server;
    use crate::provider::{ChatTurn, ModelProvider, ProviderError};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Model that replays scripted turns and records what it was sent
    struct ScriptedModel {
        turns: Mutex<VecDeque<std::result::Result<ChatTurn, ProviderError>>>,
        repeat: Option<ChatTurn>,
        seen: Arc<Mutex<Vec<Vec<Message>>>>,
    }

    impl ScriptedModel {
        fn new(turns: Vec<std::result::Result<ChatTurn, ProviderError>>) -> Self {
            Self {
                turns: Mutex::new(turns.into()),
                repeat: None,
                seen: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn provider(&self) -> ModelProvider {
            ModelProvider::Ollama
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ChatRequest<'_>,
        ) -> std::result::Result<ChatTurn, ProviderError> {
            self.seen.lock().unwrap().push(request.messages.to_vec());
            match self.turns.lock().unwrap().pop_front() {
                Some(turn) => turn,
                None => Ok(self.repeat.clone().expect("script exhausted")),
            }
        }
    }

    fn text_turn(text: &str) -> ChatTurn {
        ChatTurn {
            content: vec![ContentBlock::text(text)],
            usage: TokenUsage {
                requests: 1,
                input_tokens: 10,
                output_tokens: 5,
                cache_read_input_tokens: None,
            },
            stop_reason: Some("end_turn".to_string()),
        }
    }

    fn tool_turn(id: &str, name: &str, input: Value) -> ChatTurn {
        ChatTurn {
            content: vec![ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            }],
            usage: TokenUsage {
                requests: 1,
                input_tokens: 20,
                output_tokens: 3,
                cache_read_input_tokens: None,
            },
            stop_reason: Some("tool_use".to_string()),
        }
    }

    async fn session(model: ScriptedModel) -> AgentSession {
        let mut server = fake_server("fs", &["read_file"]);
        server.initialize().await.unwrap();
        let mut mcp = McpManager::new();
        mcp.add(server);
        AgentSession::new(mcp, Box::new(model), "be brief".to_string())
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let mut session = session(ScriptedModel::new(vec![Ok(text_turn("hello"))])).await;

        let output = session.run_round("hi").await.unwrap();
        assert_eq!(output.text, "hello");
        assert_eq!(output.usage.requests, 1);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.tools()[0].name, "mcp__fs__read_file");
    }

    #[tokio::test]
    async fn test_tool_call_result_is_fed_back() {
        let model = ScriptedModel::new(vec![
            Ok(tool_turn("call_1", "mcp__fs__read_file", json!({"path": "/a"}))),
            Ok(text_turn("the file says hi")),
        ]);
        let seen = model.seen.clone();
        let mut session = session(model).await;

        let output = session.run_round("read /a").await.unwrap();
        assert_eq!(output.text, "the file says hi");
        assert_eq!(output.usage.requests, 2);
        assert_eq!(output.usage.input_tokens, 30);

        let second_request = &seen.lock().unwrap()[1];
        assert_eq!(
            second_request.last().unwrap().content,
            vec![ContentBlock::ToolResult {
                tool_use_id: "call_1".to_string(),
                content: r#"read_file:{"path":"/a"}"#.to_string(),
                is_error: false,
            }]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let model = ScriptedModel::new(vec![
            Ok(tool_turn("call_1", "made_up_tool", json!({}))),
            Ok(text_turn("sorry")),
        ]);
        let seen = model.seen.clone();
        let mut session = session(model).await;

        let output = session.run_round("do it").await.unwrap();
        assert_eq!(output.text, "sorry");

        let second_request = &seen.lock().unwrap()[1];
        match &second_request.last().unwrap().content[0] {
            ContentBlock::ToolResult { is_error, content, .. } => {
                assert!(*is_error);
                assert!(content.contains("made_up_tool"));
            }
            other => panic!("expected tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_tool_call_is_reported_to_model() {
        let model = ScriptedModel::new(vec![
            Ok(tool_turn("call_1", "mcp__fs__reject", json!({}))),
            Ok(text_turn("I need a path")),
        ]);
        let seen = model.seen.clone();
        let mut session = session(model).await;

        let output = session.run_round("read something").await.unwrap();
        assert_eq!(output.text, "I need a path");

        let second_request = &seen.lock().unwrap()[1];
        assert_eq!(
            second_request.last().unwrap().content,
            vec![ContentBlock::ToolResult {
                tool_use_id: "call_1".to_string(),
                content: "RPC error -32602: Invalid arguments: path required".to_string(),
                is_error: true,
            }]
        );
    }

    #[tokio::test]
    async fn test_step_limit() {
        let mut model = ScriptedModel::new(vec![]);
        model.repeat = Some(tool_turn("call", "mcp__fs__read_file", json!({})));
        let mut session = session(model).await.with_max_model_calls(3);

        let err = session.run_round("loop forever").await.unwrap_err();
        assert!(matches!(err, AppError::ToolStepLimit(3)));
        assert!(session.history().is_empty());
        assert_eq!(session.usage().requests, 3);
    }

    #[tokio::test]
    async fn test_provider_error_ends_round() {
        let model = ScriptedModel::new(vec![Err(ProviderError::Api {
            status: 401,
            message: "invalid x-api-key".to_string(),
        })]);
        let mut session = session(model).await;

        let err = session.run_round("hi").await.unwrap_err();
        assert!(matches!(err, AppError::Provider(ProviderError::Api { status: 401, .. })));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_carries_across_rounds() {
        let model = ScriptedModel::new(vec![Ok(text_turn("first")), Ok(text_turn("second"))]);
        let seen = model.seen.clone();
        let mut session = session(model).await;

        session.run_round("one").await.unwrap();
        session.run_round("two").await.unwrap();

        let requests = seen.lock().unwrap();
        assert_eq!(requests[1].len(), 3);
        assert_eq!(requests[1][0], Message::user_text("one"));
        assert_eq!(session.usage().requests, 2);

        drop(requests);
        session.shutdown().await;
    }
}
