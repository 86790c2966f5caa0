//! Styled terminal output outside the conversation itself

use std::fmt::Write as _;

use console::style;

use crate::catalog::Catalog;
use crate::chat::ExitReason;
use crate::session::SessionConfig;
use crate::types::TokenUsage;

/// Render the catalog for `--list-mcps`
pub fn catalog_listing(catalog: &Catalog) -> String {
    let mut out = String::from("Available MCP servers:\n");
    let width = catalog.entries().iter().map(|e| e.id.len()).max().unwrap_or(0);

    for entry in catalog.entries() {
        let _ = write!(
            out,
            "\n  {:>2}. {:<width$}  {}",
            entry.ordinal,
            style(entry.id).bold(),
            entry.description,
        );

        let mut needs = Vec::new();
        if entry.requires_folders {
            needs.push("--folder".to_string());
        }
        needs.extend(entry.required_env.iter().map(|v| (*v).to_string()));
        if !needs.is_empty() {
            let _ = write!(
                out,
                "\n      {} {}",
                style("requires:").dim(),
                needs.join(", ")
            );
        }
    }

    out.push_str("\n\nSelect with --mcp using ids or numbers, e.g. --mcp filesystem,github or --mcp 1,2\n");
    out
}

/// Summary printed before the session starts
pub fn session_summary(config: &SessionConfig) -> String {
    let folders: Vec<String> = config
        .folders
        .iter()
        .map(|f| f.display().to_string())
        .collect();

    let mut out = String::new();
    let mut line = |label: &str, value: &str| {
        let _ = writeln!(out, "{} {}", style(format!("{label}:")).bold(), value);
    };

    if !folders.is_empty() {
        line("Folders", &folders.join(", "));
    }
    line("MCP servers", &config.selection.ids().join(", "));
    line("Prompt", &config.prompt);
    line("Provider", config.provider.as_str());
    if config.chat {
        line("Follow-up mode", "enabled");
    }
    out
}

/// Closing line for the way the conversation ended
pub fn farewell(exit: ExitReason) -> Option<&'static str> {
    match exit {
        ExitReason::Completed => None,
        ExitReason::Sentinel => Some("Ending conversation."),
        ExitReason::EndOfInput => Some("Input closed, ending conversation."),
        ExitReason::Interrupted => Some("Conversation ended by user."),
    }
}

/// Session-wide usage line
pub fn session_usage(usage: &TokenUsage) -> String {
    format!("{} {}", style("Session total:").bold(), usage)
}
