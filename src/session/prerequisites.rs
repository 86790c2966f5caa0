//! Prerequisite checks run before anything is spawned
//!
//! The check is a pure function of the selection, the provider, the
//! environment and the folder list. Every violation is collected; nothing
//! short-circuits.

use std::path::PathBuf;

use crate::catalog::ResolvedSelection;
use crate::provider::{ModelProvider, claude_api_key};
use crate::types::{EnvSource, Violation};

/// Prefix every real Anthropic key starts with
const ANTHROPIC_KEY_PREFIX: &str = "sk-ant-";
/// Placeholder shipped in example `.env` files
const PLACEHOLDER_KEY_PREFIX: &str = "sk...";

/// Collect every unmet prerequisite
///
/// Order: folder rules, then environment per entry in selection order, then
/// the provider credential.
pub fn check(
    selection: &ResolvedSelection,
    provider: ModelProvider,
    env: &dyn EnvSource,
    folders: &[PathBuf],
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if selection.requires_folders() && folders.is_empty() {
        violations.push(Violation::FolderRequired);
    }

    for folder in folders {
        match std::fs::metadata(folder) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => violations.push(Violation::NotADirectory(folder.clone())),
            Err(_) => violations.push(Violation::FolderNotFound(folder.clone())),
        }
    }

    for entry in &selection.entries {
        for var in entry.required_env {
            if env.non_empty(var).is_none() {
                violations.push(Violation::MissingEnv {
                    var: (*var).to_string(),
                    required_by: entry.id.to_string(),
                });
            }
        }
    }

    if let Some(violation) = check_provider(provider, env) {
        violations.push(violation);
    }

    if !violations.is_empty() {
        tracing::debug!(count = violations.len(), "Prerequisite check failed");
    }

    violations
}

fn check_provider(provider: ModelProvider, env: &dyn EnvSource) -> Option<Violation> {
    match provider {
        ModelProvider::Ollama => None,
        ModelProvider::Claude => match claude_api_key(env) {
            None => Some(Violation::MissingEnv {
                var: "CLAUDE_API_KEY".to_string(),
                required_by: provider.to_string(),
            }),
            Some((var, key)) if key.starts_with(PLACEHOLDER_KEY_PREFIX) => {
                Some(Violation::InvalidCredential {
                    var: var.to_string(),
                    reason: "still set to the placeholder value".to_string(),
                })
            }
            Some((var, key)) if !key.starts_with(ANTHROPIC_KEY_PREFIX) => {
                Some(Violation::InvalidCredential {
                    var: var.to_string(),
                    reason: format!("expected a key starting with `{ANTHROPIC_KEY_PREFIX}`"),
                })
            }
            Some(_) => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, parse_tokens};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn selection(raw: &str) -> ResolvedSelection {
        Catalog::builtin().resolve(&parse_tokens(raw))
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_ready_selection_has_no_violations() {
        let dir = tempfile::tempdir().unwrap();
        let violations = check(
            &selection("filesystem,memory"),
            ModelProvider::Ollama,
            &env(&[]),
            &[dir.path().to_path_buf()],
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn test_folder_required_regardless_of_other_entries() {
        let violations = check(
            &selection("memory,filesystem,git"),
            ModelProvider::Ollama,
            &env(&[]),
            &[],
        );
        assert_eq!(violations, vec![Violation::FolderRequired]);
    }

    #[test]
    fn test_every_bad_folder_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "hi").unwrap();
        let missing_a = dir.path().join("a");
        let missing_b = dir.path().join("b");

        let violations = check(
            &selection("git"),
            ModelProvider::Ollama,
            &env(&[]),
            &[missing_a.clone(), file.clone(), missing_b.clone()],
        );
        assert_eq!(
            violations,
            vec![
                Violation::FolderNotFound(missing_a),
                Violation::NotADirectory(file),
                Violation::FolderNotFound(missing_b),
            ]
        );
    }

    #[test]
    fn test_missing_env_per_entry_in_selection_order() {
        let violations = check(
            &selection("brave-search,github,sqlite"),
            ModelProvider::Ollama,
            &env(&[("SQLITE_DB_PATH", "/tmp/db.sqlite"), ("GITHUB_PERSONAL_ACCESS_TOKEN", "  ")]),
            &[],
        );
        assert_eq!(
            violations,
            vec![
                Violation::MissingEnv {
                    var: "BRAVE_API_KEY".to_string(),
                    required_by: "brave-search".to_string(),
                },
                Violation::MissingEnv {
                    var: "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
                    required_by: "github".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_claude_credentials() {
        let none = check(&selection("git"), ModelProvider::Claude, &env(&[]), &[]);
        assert_eq!(
            none,
            vec![Violation::MissingEnv {
                var: "CLAUDE_API_KEY".to_string(),
                required_by: "claude".to_string(),
            }]
        );

        let placeholder = check(
            &selection("git"),
            ModelProvider::Claude,
            &env(&[("CLAUDE_API_KEY", "sk...")]),
            &[],
        );
        assert!(matches!(
            placeholder.as_slice(),
            [Violation::InvalidCredential { var, .. }] if var == "CLAUDE_API_KEY"
        ));

        let wrong = check(
            &selection("git"),
            ModelProvider::Claude,
            &env(&[("ANTHROPIC_API_KEY", "sk-proj-123")]),
            &[],
        );
        assert!(matches!(
            wrong.as_slice(),
            [Violation::InvalidCredential { var, .. }] if var == "ANTHROPIC_API_KEY"
        ));

        let fine = check(
            &selection("git"),
            ModelProvider::Claude,
            &env(&[("ANTHROPIC_API_KEY", "sk-ant-abc")]),
            &[],
        );
        assert!(fine.is_empty());
    }

    #[test]
    fn test_check_is_idempotent() {
        let inputs = (selection("filesystem,postgres"), env(&[]));
        let first = check(&inputs.0, ModelProvider::Claude, &inputs.1, &[]);
        let second = check(&inputs.0, ModelProvider::Claude, &inputs.1, &[]);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
