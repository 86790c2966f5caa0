//! Turning raw invocation values into a validated session configuration

use std::path::PathBuf;

use crate::catalog::{Catalog, DEFAULT_SERVER_ID, ResolvedSelection, parse_tokens};
use crate::provider::ModelProvider;
use crate::types::{AppError, ConfigIssue, EnvSource, Result};

use super::prerequisites;

/// Prompt used when none is given
pub const DEFAULT_PROMPT: &str = "which justfile recipes do we have?";

/// Raw values gathered from flags and the wizard, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Folders to grant the filesystem server
    pub folders: Vec<PathBuf>,
    /// Initial prompt
    pub prompt: Option<String>,
    /// Provider identity as typed (`ollama`, `claude`)
    pub provider: Option<String>,
    /// Comma-separated catalog tokens as typed
    pub servers: Option<String>,
    /// Keep reading follow-ups after the first answer
    pub chat: bool,
}

/// A validated configuration, ready for assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub provider: ModelProvider,
    /// Canonicalized folder paths
    pub folders: Vec<PathBuf>,
    pub selection: ResolvedSelection,
    pub prompt: String,
    pub chat: bool,
}

/// Validate an invocation
///
/// Configuration issues (unknown tokens, unsupported provider) are all
/// reported together, and the prerequisite check only runs when there are
/// none. A missing or blank prompt falls back to [`DEFAULT_PROMPT`].
pub fn prepare(invocation: &Invocation, env: &dyn EnvSource) -> Result<SessionConfig> {
    let mut issues = Vec::new();

    let provider = match invocation.provider.as_deref() {
        None => ModelProvider::default(),
        Some(raw) => raw.parse::<ModelProvider>().unwrap_or_else(|raw: String| {
            issues.push(ConfigIssue::UnsupportedProvider(raw.trim().to_string()));
            ModelProvider::default()
        }),
    };

    let tokens = match invocation.servers.as_deref() {
        None => vec![DEFAULT_SERVER_ID.to_string()],
        Some(raw) => parse_tokens(raw),
    };
    if tokens.is_empty() {
        issues.push(ConfigIssue::NoServersSelected);
    }

    let selection = Catalog::builtin().resolve(&tokens);
    issues.extend(
        selection
            .unresolved
            .iter()
            .cloned()
            .map(ConfigIssue::UnknownServer),
    );

    let prompt = invocation
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PROMPT)
        .to_string();

    if !issues.is_empty() {
        return Err(AppError::Configuration(issues));
    }

    let violations = prerequisites::check(&selection, provider, env, &invocation.folders);
    if !violations.is_empty() {
        return Err(AppError::Prerequisites(violations));
    }

    let folders = invocation
        .folders
        .iter()
        .map(std::fs::canonicalize)
        .collect::<std::io::Result<Vec<_>>>()?;

    tracing::debug!(
        provider = %provider,
        servers = ?selection.ids(),
        folders = folders.len(),
        chat = invocation.chat,
        "Session configuration ready"
    );

    Ok(SessionConfig {
        provider,
        folders,
        selection,
        prompt,
        chat: invocation.chat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Violation;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn invocation(servers: &str) -> Invocation {
        Invocation {
            prompt: Some("what is in here?".to_string()),
            servers: Some(servers.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_claude_filesystem_sqlite_is_ready() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation {
            folders: vec![dir.path().to_path_buf()],
            provider: Some("claude".to_string()),
            ..invocation("filesystem,sqlite")
        };
        let env = env(&[
            ("CLAUDE_API_KEY", "sk-ant-test"),
            ("SQLITE_DB_PATH", "/tmp/test.db"),
        ]);

        let config = prepare(&inv, &env).unwrap();
        assert_eq!(config.provider, ModelProvider::Claude);
        assert_eq!(config.selection.ids(), vec!["filesystem", "sqlite"]);
        assert_eq!(config.folders, vec![dir.path().canonicalize().unwrap()]);
        assert_eq!(config.prompt, "what is in here?");
    }

    #[test]
    fn test_filesystem_without_folder_is_one_violation() {
        let err = prepare(&invocation("filesystem"), &env(&[])).unwrap_err();
        match err {
            AppError::Prerequisites(violations) => {
                assert_eq!(violations, vec![Violation::FolderRequired]);
            }
            other => panic!("expected prerequisites error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tokens_are_configuration_error() {
        let err = prepare(&invocation("unknown1,unknown2"), &env(&[])).unwrap_err();
        match err {
            AppError::Configuration(issues) => assert_eq!(
                issues,
                vec![
                    ConfigIssue::UnknownServer("unknown1".to_string()),
                    ConfigIssue::UnknownServer("unknown2".to_string()),
                ]
            ),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_configuration_issues_are_collected_together() {
        let inv = Invocation {
            provider: Some("gpt".to_string()),
            servers: Some("bogus".to_string()),
            ..Default::default()
        };
        let err = prepare(&inv, &env(&[])).unwrap_err();
        match err {
            AppError::Configuration(issues) => assert_eq!(
                issues,
                vec![
                    ConfigIssue::UnsupportedProvider("gpt".to_string()),
                    ConfigIssue::UnknownServer("bogus".to_string()),
                ]
            ),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_mcp_list_is_rejected() {
        let err = prepare(&invocation(" , "), &env(&[])).unwrap_err();
        assert!(matches!(
            err,
            AppError::Configuration(ref issues) if issues == &vec![ConfigIssue::NoServersSelected]
        ));
    }

    #[test]
    fn test_defaults_to_filesystem_and_ollama() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation {
            folders: vec![dir.path().to_path_buf()],
            prompt: Some("hi".to_string()),
            chat: true,
            ..Default::default()
        };
        let config = prepare(&inv, &env(&[])).unwrap();
        assert_eq!(config.provider, ModelProvider::Ollama);
        assert_eq!(config.selection.ids(), vec!["filesystem"]);
        assert!(config.chat);
    }

    #[test]
    fn test_blank_prompt_falls_back_to_default() {
        let inv = Invocation {
            prompt: Some("   ".to_string()),
            servers: Some("git".to_string()),
            ..Default::default()
        };
        let config = prepare(&inv, &env(&[])).unwrap();
        assert_eq!(config.prompt, DEFAULT_PROMPT);
    }

    #[test]
    fn test_filesystem_alone_reports_only_missing_folder() {
        let inv = Invocation {
            servers: Some("filesystem".to_string()),
            ..Default::default()
        };
        let err = prepare(&inv, &env(&[])).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        match err {
            AppError::Prerequisites(violations) => {
                assert_eq!(violations, vec![Violation::FolderRequired]);
            }
            other => panic!("expected prerequisites error, got {other:?}"),
        }
    }
}
