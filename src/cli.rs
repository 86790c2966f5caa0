//! Command-line interface definitions
//!
//! Provides CLI argument parsing using clap for the MCP assistant.

use std::path::PathBuf;

use clap::Parser;

use crate::session::Invocation;

const BIN_NAME: &str = "mcp-assistant";

/// Point a local or hosted LLM at your folders and MCP servers, and chat with it
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "mcp-assistant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Folder to grant the filesystem server access to (repeatable)
    #[arg(short, long = "folder", value_name = "DIR")]
    pub folders: Vec<PathBuf>,

    /// Prompt to run against the agent
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Model provider: ollama or claude
    #[arg(short = 'm', long, value_name = "PROVIDER", env = "MCP_ASSISTANT_PROVIDER")]
    pub provider: Option<String>,

    /// MCP servers to enable, by id or number (e.g. `filesystem,github` or `1,2`)
    #[arg(long, value_name = "LIST", env = "MCP_ASSISTANT_MCP")]
    pub mcp: Option<String>,

    /// Keep asking for follow-up questions after the first answer
    #[arg(short, long, visible_alias = "follow-up")]
    pub chat: bool,

    /// Ask for missing settings interactively
    #[arg(short, long)]
    pub interactive: bool,

    /// Print the available MCP servers and exit
    #[arg(long)]
    pub list_mcps: bool,

    /// Enable diagnostic mode (auto-log to temp file)
    #[arg(short, long)]
    pub diagnostic: bool,

    /// Log directory (implies diagnostic mode)
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log file name (implies diagnostic mode)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    /// Note: RUST_LOG env var takes priority over this flag
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors, no usage lines)
    /// Note: RUST_LOG env var takes priority over this flag
    #[arg(short, long)]
    pub quiet: bool,

    /// OpenTelemetry OTLP endpoint (e.g., http://localhost:4317)
    /// Only used when built with the otel feature.
    #[arg(long, value_name = "URL", env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otel_endpoint: Option<String>,
}

impl Cli {
    /// Raw session values given on the command line
    pub fn invocation(&self) -> Invocation {
        Invocation {
            folders: self.folders.clone(),
            prompt: self.prompt.clone(),
            provider: self.provider.clone(),
            servers: self.mcp.clone(),
            chat: self.chat,
        }
    }

    /// Check if diagnostic mode is enabled (output to file)
    ///
    /// Returns true if `--diagnostic` is set, or if `--log-dir` or `--log-file` is specified.
    pub fn is_diagnostic(&self) -> bool {
        self.diagnostic || self.log_dir.is_some() || self.log_file.is_some()
    }

    /// Check if OpenTelemetry tracing is enabled
    #[cfg(feature = "otel")]
    pub fn is_otel_enabled(&self) -> bool {
        self.otel_endpoint.is_some()
    }

    /// Check if OpenTelemetry tracing is enabled (always false without otel feature)
    #[cfg(not(feature = "otel"))]
    pub fn is_otel_enabled(&self) -> bool {
        if self.otel_endpoint.is_some() {
            tracing::warn!("--otel-endpoint specified but otel feature is not enabled, ignoring");
        }
        false
    }

    /// Get the log level based on CLI arguments
    ///
    /// - `--quiet`: ERROR
    /// - default: WARN
    /// - `-v`: INFO
    /// - `-vv`: DEBUG
    /// - `-vvv` or more: TRACE
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else {
            match self.verbose {
                0 => tracing::Level::WARN,
                1 => tracing::Level::INFO,
                2 => tracing::Level::DEBUG,
                _ => tracing::Level::TRACE,
            }
        }
    }

    /// Get the log file path for diagnostic mode
    ///
    /// Uses the specified log directory and file name, or defaults to:
    /// - Directory: system temp directory
    /// - File: `mcp-assistant-{timestamp}.log`
    pub fn log_path(&self) -> PathBuf {
        let dir = self
            .log_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);

        let filename = self.log_file.clone().unwrap_or_else(|| {
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            format!("{BIN_NAME}-{timestamp}.log")
        });

        dir.join(filename)
    }
}
