//! MCP server manager
//!
//! Owns every server connection of a session and routes namespaced tool
//! calls to the right one.

use serde_json::Value;

use super::external::{ExternalMcpError, ExternalMcpServer};
use super::types::{ServerLaunchSpec, ToolResult};
use crate::provider::ToolSchema;

/// Prefix of every tool name exposed to the model
pub const TOOL_PREFIX: &str = "mcp__";

/// Manager for the MCP servers of one session
#[derive(Debug, Default)]
pub struct McpManager {
    servers: Vec<ExternalMcpServer>,
}

impl McpManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn and initialize every server, in order
    ///
    /// If any server fails, the ones already running are shut down before the
    /// error is returned.
    pub async fn connect_all(specs: &[ServerLaunchSpec]) -> Result<Self, ExternalMcpError> {
        let mut manager = Self::new();

        for spec in specs {
            tracing::info!(server = %spec.name, command = %spec, "Starting MCP server");
            let start_time = std::time::Instant::now();

            let connected = match ExternalMcpServer::spawn(spec) {
                Ok(mut server) => match server.initialize().await {
                    Ok(()) => Ok(server),
                    Err(e) => {
                        server.shutdown().await;
                        Err(e)
                    }
                },
                Err(e) => Err(e),
            };

            match connected {
                Ok(server) => {
                    tracing::info!(
                        server = %spec.name,
                        tool_count = server.tools().len(),
                        elapsed_ms = start_time.elapsed().as_millis(),
                        "MCP server connected"
                    );
                    manager.add(server);
                }
                Err(e) => {
                    tracing::error!(server = %spec.name, error = %e, "MCP server failed to start");
                    manager.shutdown().await;
                    return Err(ExternalMcpError::StartFailed {
                        server: spec.name.clone(),
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(manager)
    }

    /// Add an initialized server
    pub fn add(&mut self, server: ExternalMcpServer) {
        self.servers.push(server);
    }

    /// Names of the connected servers, in connection order
    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of connected servers
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether no server is connected
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Every tool of every server, with namespaced names
    pub fn all_tools(&self) -> Vec<ToolSchema> {
        self.servers
            .iter()
            .flat_map(|server| {
                server.tools().iter().map(move |tool| ToolSchema {
                    name: format!("{TOOL_PREFIX}{}__{}", server.name, tool.name),
                    description: format!("[{}] {}", server.name, tool.description),
                    input_schema: tool.input_schema.clone(),
                })
            })
            .collect()
    }

    /// Call a namespaced tool (`mcp__<server>__<tool>`)
    pub async fn call_tool(
        &mut self,
        full_name: &str,
        arguments: Value,
    ) -> Result<ToolResult, ExternalMcpError> {
        let (server_name, tool_name) = split_tool_name(full_name)
            .ok_or_else(|| ExternalMcpError::InvalidToolName(full_name.to_string()))?;

        let server = self
            .servers
            .iter_mut()
            .find(|s| s.name == server_name)
            .ok_or_else(|| ExternalMcpError::ServerNotFound(server_name.to_string()))?;

        tracing::debug!(server = %server_name, tool = %tool_name, "Calling MCP tool");
        server.call_tool(tool_name, arguments).await
    }

    /// Shut down every server
    pub async fn shutdown(&mut self) {
        for server in &mut self.servers {
            server.shutdown().await;
        }
        self.servers.clear();
    }
}

/// Split `mcp__<server>__<tool>` into its server and tool parts
///
/// Server ids never contain `__`, so the first separator after the prefix
/// ends the server part and tool names may contain `__` themselves.
pub fn split_tool_name(full_name: &str) -> Option<(&str, &str)> {
    let rest = full_name.strip_prefix(TOOL_PREFIX)?;
    let (server, tool) = rest.split_once("__")?;
    if server.is_empty() || tool.is_empty() {
        return None;
    }
    Some((server, tool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::external::tests::fake_server;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn manager_with(servers: &[(&str, &[&str])]) -> McpManager {
        let mut manager = McpManager::new();
        for (name, tools) in servers {
            let mut server = fake_server(name, tools);
            server.initialize().await.unwrap();
            manager.add(server);
        }
        manager
    }

    #[test]
    fn test_split_tool_name() {
        assert_eq!(
            split_tool_name("mcp__filesystem__read_file"),
            Some(("filesystem", "read_file"))
        );
        assert_eq!(
            split_tool_name("mcp__brave-search__web__search"),
            Some(("brave-search", "web__search"))
        );
        assert_eq!(split_tool_name("read_file"), None);
        assert_eq!(split_tool_name("mcp__filesystem"), None);
        assert_eq!(split_tool_name("mcp____x"), None);
    }

    #[tokio::test]
    async fn test_all_tools_are_namespaced() {
        let manager = manager_with(&[("filesystem", &["read_file"]), ("git", &["git_status"])]).await;

        assert_eq!(manager.server_names(), vec!["filesystem", "git"]);
        let tools = manager.all_tools();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["mcp__filesystem__read_file", "mcp__git__git_status"]);
        assert_eq!(tools[0].description, "[filesystem] read_file tool");
    }

    #[tokio::test]
    async fn test_call_tool_routes_to_server() {
        let mut manager = manager_with(&[("filesystem", &["read_file"]), ("git", &["git_status"])]).await;

        let result = manager
            .call_tool("mcp__git__git_status", json!({"repo_path": "."}))
            .await
            .unwrap();
        assert_eq!(result.content, r#"git_status:{"repo_path":"."}"#);
    }

    #[tokio::test]
    async fn test_call_tool_routing_errors() {
        let mut manager = manager_with(&[("filesystem", &["read_file"])]).await;

        let err = manager.call_tool("read_file", json!({})).await.unwrap_err();
        assert!(matches!(err, ExternalMcpError::InvalidToolName(_)));
        assert!(err.is_routing_error());

        let err = manager
            .call_tool("mcp__github__search", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalMcpError::ServerNotFound(name) if name == "github"));
    }

    #[tokio::test]
    async fn test_connect_all_reports_failing_server() {
        let specs = vec![ServerLaunchSpec {
            name: "ghost".to_string(),
            command: "definitely-not-a-real-mcp-server-binary".to_string(),
            args: vec![],
            env: Default::default(),
        }];

        let err = McpManager::connect_all(&specs).await.unwrap_err();
        assert!(matches!(err, ExternalMcpError::StartFailed { ref server, .. } if server == "ghost"));
    }

    #[tokio::test]
    async fn test_shutdown_clears_servers() {
        let mut manager = manager_with(&[("memory", &["create_entities"])]).await;
        manager.shutdown().await;
        assert!(manager.is_empty());
    }
}
