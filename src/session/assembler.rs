//! Session assembly
//!
//! Pure translation of a [`SessionConfig`] into launch specifications and a
//! model descriptor. Nothing is spawned and no connection is opened here.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::catalog::{CatalogEntry, ServerKind};
use crate::mcp::ServerLaunchSpec;
use crate::provider::ModelDescriptor;
use crate::types::{AppError, EnvSource, Result, Violation};

use super::config::SessionConfig;

const NPX: &str = "npx";
const UVX: &str = "uvx";

/// Everything needed to start a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    /// One launch spec per selected server, in selection order
    pub servers: Vec<ServerLaunchSpec>,
    /// How to reach the model
    pub model: ModelDescriptor,
    /// System prompt sent with every request
    pub system_prompt: String,
}

/// Build the plan for a validated configuration
pub fn assemble(config: &SessionConfig, env: &dyn EnvSource) -> Result<SessionPlan> {
    let model = ModelDescriptor::from_env(config.provider, env).ok_or_else(|| {
        AppError::Prerequisites(vec![Violation::MissingEnv {
            var: "CLAUDE_API_KEY".to_string(),
            required_by: config.provider.to_string(),
        }])
    })?;

    let servers = config
        .selection
        .entries
        .iter()
        .map(|entry| launch_spec(entry, &config.folders, env))
        .collect();

    Ok(SessionPlan {
        servers,
        model,
        system_prompt: system_prompt(&config.folders),
    })
}

/// Launch specification for one catalog entry
pub fn launch_spec(entry: &CatalogEntry, folders: &[PathBuf], env: &dyn EnvSource) -> ServerLaunchSpec {
    let mut vars = BTreeMap::new();
    for var in entry.required_env.iter().chain(entry.optional_env) {
        if let Some(value) = env.non_empty(var) {
            vars.insert((*var).to_string(), value);
        }
    }
    let var = |name: &str| vars.get(name).cloned().unwrap_or_default();

    let (command, args): (&str, Vec<String>) = match entry.kind {
        ServerKind::Filesystem => {
            let mut args = npx_args("@modelcontextprotocol/server-filesystem");
            args.extend(folders.iter().map(|f| f.display().to_string()));
            (NPX, args)
        }
        ServerKind::Github => (NPX, npx_args("@modelcontextprotocol/server-github")),
        ServerKind::Git => (UVX, vec!["mcp-server-git".to_string()]),
        ServerKind::Sqlite => (
            UVX,
            vec![
                "mcp-server-sqlite".to_string(),
                "--db-path".to_string(),
                var("SQLITE_DB_PATH"),
            ],
        ),
        ServerKind::Postgres => {
            let mut args = npx_args("@modelcontextprotocol/server-postgres");
            args.push(var("POSTGRES_CONNECTION_STRING"));
            (NPX, args)
        }
        ServerKind::BraveSearch => (NPX, npx_args("@modelcontextprotocol/server-brave-search")),
        ServerKind::Memory => (NPX, npx_args("@modelcontextprotocol/server-memory")),
        ServerKind::Fetch => (UVX, vec!["mcp-server-fetch".to_string()]),
    };

    ServerLaunchSpec {
        name: entry.id.to_string(),
        command: command.to_string(),
        args,
        env: vars,
    }
}

fn npx_args(package: &str) -> Vec<String> {
    vec!["-y".to_string(), package.to_string()]
}

/// System prompt telling the model where it may look
pub fn system_prompt(folders: &[PathBuf]) -> String {
    let mut prompt = String::from(
        "You are a helpful assistant with access to tools provided by MCP servers. \
         Use the tools when they help answer the user's request, and answer concisely.",
    );

    if !folders.is_empty() {
        prompt.push_str(
            "\n\nYou can access the following folders. Always use absolute paths inside them:",
        );
        for folder in folders {
            prompt.push_str(&format!("\n- {}", folder.display()));
        }
    }

    prompt
}
