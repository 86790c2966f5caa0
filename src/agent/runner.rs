//! Assistant runner
//!
//! Entry point tying the pieces together: wizard, validation, assembly,
//! session startup, the chat loop and teardown.

use console::style;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalog::Catalog;
use crate::chat::{ChatLoop, ConsoleSink, ExitReason, LoopOutcome, ReaderLines};
use crate::cli::Cli;
use crate::display;
use crate::session::{AgentSession, Invocation, assemble, prepare};
use crate::telemetry::ResultTraceExt;
use crate::types::{AppError, ProcessEnv, Result};
use crate::wizard::{self, DialoguerPrompter};

/// What a run ended with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// `--list-mcps` printed the catalog
    CatalogListed,
    /// A conversation took place (possibly interrupted before the first answer)
    Conversation(LoopOutcome),
}

/// Run the assistant with CLI arguments
///
/// Logging must already be initialized.
pub async fn run_with_cli(cli: &Cli) -> Result<RunOutcome> {
    let startup_time = std::time::Instant::now();
    let run_id = uuid::Uuid::new_v4();

    tracing::info!(
        version = %env!("CARGO_PKG_VERSION"),
        pid = %std::process::id(),
        run_id = %run_id,
        start_time = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        diagnostic = cli.is_diagnostic(),
        "MCP assistant starting"
    );
    tracing::debug!(
        rust_log = ?std::env::var("RUST_LOG").ok(),
        cwd = ?std::env::current_dir().ok(),
        "Environment configuration"
    );

    if cli.list_mcps {
        println!("{}", display::catalog_listing(Catalog::builtin()));
        return Ok(RunOutcome::CatalogListed);
    }

    let mut invocation = cli.invocation();
    if wizard::should_run(cli.interactive, &invocation) {
        tracing::debug!("Starting interactive setup");
        invocation = run_wizard(invocation).await?;
    }

    let env = ProcessEnv;
    let config = prepare(&invocation, &env).trace_context()?;
    println!("{}", display::session_summary(&config));

    let plan = assemble(&config, &env)?;
    tracing::debug!(
        servers = plan.servers.len(),
        model = ?plan.model,
        "Session plan assembled"
    );

    let cancel = CancellationToken::new();
    let watcher = spawn_signal_watcher(cancel.clone());

    // Dropping a half-started session kills its process groups.
    let started = tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        session = AgentSession::start(&plan) => Some(session?),
    };
    let Some(mut session) = started else {
        watcher.abort();
        return Ok(interrupted_before_start());
    };

    tracing::info!(
        session_id = %session.session_id,
        startup_ms = startup_time.elapsed().as_millis(),
        "Session ready"
    );

    let mut chat = ChatLoop::new(config.chat, cancel);
    let mut lines = ReaderLines::stdin();
    let mut sink = ConsoleSink { quiet: cli.quiet };
    let result = chat
        .run(&mut session, &mut lines, &mut sink, &config.prompt)
        .await;

    session.shutdown().await;
    watcher.abort();

    let outcome = result?;
    if let Some(message) = display::farewell(outcome.exit) {
        println!("\n{}", style(message).yellow());
    }
    if config.chat && outcome.rounds > 1 && !cli.quiet {
        println!("{}", display::session_usage(&session.usage()));
    }

    tracing::info!(
        rounds = outcome.rounds,
        exit = ?outcome.exit,
        uptime_ms = startup_time.elapsed().as_millis(),
        "MCP assistant finished"
    );

    Ok(RunOutcome::Conversation(outcome))
}

fn interrupted_before_start() -> RunOutcome {
    println!("\n{}", style("Interrupted before the session started.").yellow());
    RunOutcome::Conversation(LoopOutcome {
        rounds: 0,
        exit: ExitReason::Interrupted,
    })
}

/// Run the blocking terminal wizard off the async workers
async fn run_wizard(invocation: Invocation) -> Result<Invocation> {
    tokio::task::spawn_blocking(move || {
        wizard::complete(invocation, &mut DialoguerPrompter::new())
    })
    .await
    .map_err(|e| AppError::internal(format!("interactive setup task failed: {e}")))?
}

/// Cancel `cancel` on Ctrl-C or SIGTERM
fn spawn_signal_watcher(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = ctrl_c() => eprintln!("\nReceived SIGINT, shutting down..."),
            () = sigterm() => eprintln!("\nReceived SIGTERM, shutting down..."),
        }
        cancel.cancel();
    })
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn sigterm() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
    }
}
