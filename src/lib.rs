//! MCP Assistant
//!
//! Point a local or hosted LLM at your folders and a catalog of MCP servers
//! (filesystem, GitHub, git, SQLite, PostgreSQL, Brave Search, memory,
//! fetch), then ask it questions from the terminal.
//!
//! ## Features
//!
//! - Server selection by id or number (`--mcp filesystem,github` or `--mcp 1,2`)
//! - Prerequisite checks for folders, environment variables and API keys
//! - Ollama (OpenAI-compatible `/v1`) and Claude (Anthropic Messages API)
//! - Follow-up chat mode and a guided interactive setup
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use mcp_assistant::{Cli, run_with_cli};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse();
//!     mcp_assistant::telemetry::init_logging(&cli)?;
//!     run_with_cli(&cli).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! - `OLLAMA_BASE_URL`: Ollama endpoint (default: `http://127.0.0.1:11434/`)
//! - `OLLAMA_MODEL`: Ollama model (default: `llama4`)
//! - `CLAUDE_API_KEY` / `ANTHROPIC_API_KEY`: Claude API key
//! - `CLAUDE_MODEL`: Claude model (default: `claude-3-5-sonnet-20241022`)
//! - `ANTHROPIC_BASE_URL`: Custom Anthropic API base URL
//! - `GITHUB_PERSONAL_ACCESS_TOKEN`, `SQLITE_DB_PATH`,
//!   `POSTGRES_CONNECTION_STRING`, `BRAVE_API_KEY`: required by the
//!   matching MCP servers
//! - `MEMORY_FILE_PATH`: optional storage path for the memory server
//! - `MCP_ASSISTANT_PROVIDER`, `MCP_ASSISTANT_MCP`: defaults for
//!   `--provider` and `--mcp`
//!
//! ## Configuration Loading Priority
//!
//! 1. **Command-line flags**
//! 2. **Environment Variables**
//! 3. **`.env` file** in the working directory (never overrides set variables)
//! 4. **Defaults**

pub mod agent;
pub mod catalog;
pub mod chat;
pub mod cli;
pub mod display;
pub mod mcp;
pub mod provider;
pub mod session;
pub mod telemetry;
pub mod types;
pub mod wizard;

pub use agent::{RunOutcome, run_with_cli};
pub use catalog::{Catalog, CatalogEntry, ResolvedSelection};
pub use chat::{ChatLoop, ExitReason, LoopOutcome, RoundExecutor};
pub use cli::Cli;
pub use session::{AgentSession, Invocation, SessionConfig, SessionPlan};
pub use types::{AppError, Result};
