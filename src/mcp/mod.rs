//! MCP (Model Context Protocol) client side
//!
//! Each selected catalog entry runs as an external MCP server process,
//! spoken to over newline-delimited JSON-RPC on its stdio.
//!
//! - `external`: one server connection (spawn, handshake, tool calls)
//! - `manager`: the set of servers in a session and tool routing
//! - `wrapped_child`: process group handle used for teardown

mod external;
mod manager;
mod types;
mod wrapped_child;

pub use external::{ExternalMcpError, ExternalMcpServer, PROTOCOL_VERSION};
pub use manager::{McpManager, TOOL_PREFIX, split_tool_name};
pub use types::{ServerLaunchSpec, ToolResult};
pub use wrapped_child::WrappedChild;

#[cfg(test)]
pub(crate) use external::tests::fake_server;
