//! MCP assistant binary
//!
//! Run with: cargo run -- --folder . --prompt "what is this project?"
//!
//! For help: cargo run -- --help

use std::io::IsTerminal;

use clap::Parser;
use console::style;
use mcp_assistant::telemetry::{ErrorTraceExt, init_logging, shutdown_otel};
use mcp_assistant::{Cli, run_with_cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so `.env` values can back the clap `env` fallbacks
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(&cli)?;

    match &dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => tracing::warn!(error = %e, "Failed to load .env"),
    }

    let result = run_with_cli(&cli).await;

    shutdown_otel();

    let code = match result {
        Ok(_) => 0,
        Err(e) => {
            e.trace_error();
            eprintln!("{} {}", style("Error:").red().bold(), e);

            if !e.is_client_error() && std::io::stdin().is_terminal() {
                eprintln!("\nFor debugging, run with --diagnostic to log to a file.");
                eprintln!("Or use -v/-vv/-vvv for more verbose logging.");
            }

            e.exit_code()
        }
    };

    // A pending stdin read would otherwise hold the runtime open.
    std::process::exit(code)
}
