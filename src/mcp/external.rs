//! External MCP server connection
//!
//! Spawns a server process, performs the MCP handshake and forwards tool
//! calls to it.

use std::collections::HashSet;
use std::process::Stdio;
use std::time::Duration;

use process_wrap::tokio::{CommandWrap, KillOnDrop};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::types::{ServerLaunchSpec, ToolResult};
use super::wrapped_child::WrappedChild;
use crate::provider::ToolSchema;

/// MCP protocol revision sent in `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// First start may download the server package, so the handshake gets longer
const INIT_TIMEOUT: Duration = Duration::from_secs(120);
const TOOL_CALL_TIMEOUT: Duration = Duration::from_secs(300);
const KILL_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound on `tools/list` pages per handshake
const MAX_TOOL_PAGES: usize = 64;

type Writer = Box<dyn AsyncWrite + Send + Unpin>;
type Reader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl<'a> JsonRpcRequest<'a> {
    fn new(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// Any message the server writes: response, notification or request
#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A connection to one external MCP server
pub struct ExternalMcpServer {
    /// Server name (catalog id)
    pub name: String,
    /// Process handle; `None` for in-process streams
    child: Option<WrappedChild>,
    stdin: Writer,
    stdout: Reader,
    next_id: u64,
    /// Available tools from this server
    tools: Vec<ToolSchema>,
    /// `serverInfo` reported during the handshake
    server_info: Option<Value>,
    initialized: bool,
}

impl std::fmt::Debug for ExternalMcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalMcpServer")
            .field("name", &self.name)
            .field("pid", &self.pid())
            .field("tools", &self.tools.len())
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl ExternalMcpServer {
    /// Spawn the server described by `spec` in its own process group
    pub fn spawn(spec: &ServerLaunchSpec) -> Result<Self, ExternalMcpError> {
        let mut command = CommandWrap::with_new(&spec.command, |cmd| {
            cmd.args(&spec.args)
                .envs(&spec.env)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        });
        #[cfg(unix)]
        command.wrap(process_wrap::tokio::ProcessGroup::leader());
        #[cfg(windows)]
        command.wrap(process_wrap::tokio::JobObject);
        command.wrap(KillOnDrop);

        let child = command.spawn().map_err(|e| ExternalMcpError::SpawnFailed {
            command: spec.to_string(),
            error: e.to_string(),
        })?;
        let mut child = WrappedChild::new(child);

        let (stdin, stdout, stderr) = child.take_stdio();
        let stdin = stdin.ok_or(ExternalMcpError::NoStdin)?;
        let stdout = stdout.ok_or(ExternalMcpError::NoStdout)?;

        if let Some(stderr) = stderr {
            forward_stderr(spec.name.clone(), stderr);
        }

        tracing::debug!(
            server = %spec.name,
            pid = child.id(),
            command = %spec,
            "Spawned MCP server"
        );

        let mut server = Self::from_streams(spec.name.clone(), stdin, stdout);
        server.child = Some(child);
        Ok(server)
    }

    /// Wrap an already-connected pair of streams
    pub fn from_streams(
        name: impl Into<String>,
        stdin: impl AsyncWrite + Send + Unpin + 'static,
        stdout: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        let stdout: Box<dyn AsyncRead + Send + Unpin> = Box::new(stdout);
        Self {
            name: name.into(),
            child: None,
            stdin: Box::new(stdin),
            stdout: BufReader::new(stdout),
            next_id: 0,
            tools: Vec::new(),
            server_info: None,
            initialized: false,
        }
    }

    /// Initialize the MCP server and discover its tools
    pub async fn initialize(&mut self) -> Result<(), ExternalMcpError> {
        let result = self
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION")
                    }
                })),
                INIT_TIMEOUT,
            )
            .await?;
        self.server_info = result.get("serverInfo").cloned();

        self.notify("notifications/initialized", None).await?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();
        for page_number in 1..=MAX_TOOL_PAGES {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let page = self.request("tools/list", params, INIT_TIMEOUT).await?;
            tools.extend(parse_tools(&page));

            cursor = page
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(String::from);
            let Some(next) = cursor.as_ref() else {
                break;
            };
            if !seen_cursors.insert(next.clone()) {
                tracing::warn!(server = %self.name, cursor = %next, "Repeated tools/list cursor, stopping");
                break;
            }
            if page_number == MAX_TOOL_PAGES {
                tracing::warn!(server = %self.name, pages = MAX_TOOL_PAGES, "tools/list page limit reached");
            }
        }

        tracing::debug!(
            server = %self.name,
            server_info = ?self.server_info,
            tool_count = tools.len(),
            "MCP server initialized"
        );

        self.tools = tools;
        self.initialized = true;
        Ok(())
    }

    /// Call a tool on this server
    ///
    /// A JSON-RPC error reply (bad arguments, unknown tool) comes back as an
    /// error result; only a broken connection is an `Err`.
    pub async fn call_tool(
        &mut self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolResult, ExternalMcpError> {
        if !self.initialized {
            return Err(ExternalMcpError::NotInitialized);
        }

        let reply = self
            .request(
                "tools/call",
                Some(json!({
                    "name": tool_name,
                    "arguments": arguments
                })),
                TOOL_CALL_TIMEOUT,
            )
            .await;

        match reply {
            Ok(result) => Ok(parse_tool_result(&result)),
            Err(ExternalMcpError::RpcError { code, message }) => {
                tracing::debug!(server = %self.name, tool = %tool_name, code, message = %message, "Tool call rejected");
                Ok(ToolResult::error(format!("RPC error {code}: {message}")))
            }
            Err(e) => Err(e),
        }
    }

    /// Get available tools from this server
    pub fn tools(&self) -> &[ToolSchema] {
        &self.tools
    }

    /// Check if the server is initialized
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// OS process id, when backed by a process
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(WrappedChild::id)
    }

    /// Kill the server's process group and wait for it to exit
    pub async fn shutdown(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };

        if let Ok(Some(status)) = child.try_wait() {
            tracing::debug!(server = %self.name, %status, "MCP server already exited");
            return;
        }

        match tokio::time::timeout(KILL_TIMEOUT, child.kill()).await {
            Ok(Ok(())) => tracing::debug!(server = %self.name, "MCP server stopped"),
            Ok(Err(e)) => {
                tracing::warn!(server = %self.name, error = %e, "Failed to kill MCP server");
            }
            Err(_) => tracing::warn!(server = %self.name, "Timed out waiting for MCP server to exit"),
        }
    }

    /// Send a request and wait for the response with the same id
    async fn request(
        &mut self,
        method: &str,
        params: Option<Value>,
        limit: Duration,
    ) -> Result<Value, ExternalMcpError> {
        self.next_id += 1;
        let id = self.next_id;

        let request = JsonRpcRequest::new(id, method, params);
        let message = serde_json::to_value(&request)
            .map_err(|e| ExternalMcpError::SerializationError(e.to_string()))?;
        self.write_message(&message).await?;

        match tokio::time::timeout(limit, self.read_response(id)).await {
            Ok(result) => result,
            Err(_) => Err(ExternalMcpError::Timeout {
                method: method.to_string(),
                secs: limit.as_secs(),
            }),
        }
    }

    /// Send a JSON-RPC notification (no response expected)
    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), ExternalMcpError> {
        let mut notification = json!({
            "jsonrpc": "2.0",
            "method": method,
        });
        if let Some(params) = params {
            notification["params"] = params;
        }
        self.write_message(&notification).await
    }

    async fn write_message(&mut self, message: &Value) -> Result<(), ExternalMcpError> {
        let mut line = serde_json::to_string(message)
            .map_err(|e| ExternalMcpError::SerializationError(e.to_string()))?;
        line.push('\n');

        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ExternalMcpError::WriteError(e.to_string()))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| ExternalMcpError::WriteError(e.to_string()))
    }

    /// Read messages until the response for `id` arrives
    ///
    /// Notifications are skipped and server-initiated requests are answered
    /// with "method not found", since the client advertises no capabilities.
    async fn read_response(&mut self, id: u64) -> Result<Value, ExternalMcpError> {
        loop {
            let mut line = String::new();
            let read = self
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| ExternalMcpError::ReadError(e.to_string()))?;
            if read == 0 {
                return Err(ExternalMcpError::ServerExited(self.name.clone()));
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message: IncomingMessage = match serde_json::from_str(line) {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!(server = %self.name, error = %e, line = %line, "Ignoring non JSON-RPC output");
                    continue;
                }
            };

            match (message.id, message.method) {
                (Some(request_id), Some(method)) => {
                    tracing::debug!(server = %self.name, method = %method, "Rejecting server request");
                    self.write_message(&json!({
                        "jsonrpc": "2.0",
                        "id": request_id,
                        "error": {"code": -32601, "message": format!("Method not found: {method}")}
                    }))
                    .await?;
                }
                (None, Some(method)) => {
                    tracing::trace!(server = %self.name, method = %method, "Server notification");
                }
                (Some(response_id), None) if response_id.as_u64() == Some(id) => {
                    if let Some(error) = message.error {
                        return Err(ExternalMcpError::RpcError {
                            code: error.code,
                            message: error.message,
                        });
                    }
                    return Ok(message.result.unwrap_or(Value::Null));
                }
                (response_id, None) => {
                    tracing::debug!(server = %self.name, id = ?response_id, expected = id, "Ignoring unexpected response");
                }
            }
        }
    }
}

/// Log the server's stderr at debug level until it closes
fn forward_stderr(name: String, stderr: tokio::process::ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(server = %name, "{}", line);
        }
    });
}

/// Extract tool schemas from a `tools/list` result
fn parse_tools(result: &Value) -> Vec<ToolSchema> {
    result
        .get("tools")
        .and_then(Value::as_array)
        .map(|tools| {
            tools
                .iter()
                .filter_map(|t| {
                    let name = t.get("name")?.as_str()?;
                    let description = t.get("description").and_then(Value::as_str).unwrap_or("");
                    let input_schema = t
                        .get("inputSchema")
                        .cloned()
                        .unwrap_or_else(|| json!({"type": "object"}));

                    Some(ToolSchema {
                        name: name.to_string(),
                        description: description.to_string(),
                        input_schema,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Flatten a `tools/call` result into text
fn parse_tool_result(result: &Value) -> ToolResult {
    let Some(content) = result.get("content").and_then(Value::as_array) else {
        return ToolResult::success(result.to_string());
    };

    let text = content
        .iter()
        .map(|item| match item.get("type").and_then(Value::as_str) {
            Some("text") => item
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Some("image") => format!(
                "[image: {}]",
                item.get("mimeType").and_then(Value::as_str).unwrap_or("unknown")
            ),
            Some("resource") => {
                let resource = &item["resource"];
                resource
                    .get("text")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| {
                        format!("[resource: {}]", resource["uri"].as_str().unwrap_or("unknown"))
                    })
            }
            other => format!("[{} content]", other.unwrap_or("unknown")),
        })
        .collect::<Vec<_>>()
        .join("\n");

    if result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
        ToolResult::error(text)
    } else {
        ToolResult::success(text)
    }
}

/// Errors for external MCP operations
#[derive(Debug, thiserror::Error)]
pub enum ExternalMcpError {
    /// Failed to spawn MCP server process
    #[error("Failed to spawn MCP server '{command}': {error}")]
    SpawnFailed { command: String, error: String },

    /// A server in the session failed to come up
    #[error("MCP server '{server}' failed to start: {source}")]
    StartFailed {
        server: String,
        #[source]
        source: Box<ExternalMcpError>,
    },

    /// No stdin available
    #[error("No stdin available for MCP server")]
    NoStdin,

    /// No stdout available
    #[error("No stdout available for MCP server")]
    NoStdout,

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Write error
    #[error("Write error: {0}")]
    WriteError(String),

    /// Read error
    #[error("Read error: {0}")]
    ReadError(String),

    /// The server closed its stdout
    #[error("MCP server '{0}' exited")]
    ServerExited(String),

    /// No response in time
    #[error("No response to '{method}' within {secs}s")]
    Timeout { method: String, secs: u64 },

    /// RPC error from server
    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    /// Server not initialized
    #[error("Server not initialized")]
    NotInitialized,

    /// Invalid tool name format
    #[error("Invalid tool name format: {0}")]
    InvalidToolName(String),

    /// Server not found
    #[error("MCP server not found: {0}")]
    ServerNotFound(String),
}

impl ExternalMcpError {
    /// Whether the error comes from a bad tool name rather than a broken server
    ///
    /// Routing errors are reported back to the model; everything else ends
    /// the session.
    pub fn is_routing_error(&self) -> bool {
        matches!(
            self,
            ExternalMcpError::InvalidToolName(_) | ExternalMcpError::ServerNotFound(_)
        )
    }
}
