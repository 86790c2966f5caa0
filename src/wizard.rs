//! Guided setup for runs started without flags
//!
//! Asks only for what the command line left out, then hands the completed
//! [`Invocation`] to the same validation path as a flag-driven run.

use std::io::IsTerminal;
use std::path::PathBuf;

use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select};

use crate::catalog::{Catalog, DEFAULT_SERVER_ID, parse_tokens};
use crate::provider::ModelProvider;
use crate::session::{DEFAULT_PROMPT, Invocation};
use crate::types::Result;

/// Interactive questions, abstracted so the wizard can be scripted
pub trait Prompter {
    /// Pick one item; returns its index
    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<usize>;

    /// Pick any number of items; returns their indexes
    fn multi_select(&mut self, prompt: &str, items: &[String], defaults: &[bool])
    -> Result<Vec<usize>>;

    /// Free text; an empty answer is allowed when `default` is `None`
    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String>;

    /// Yes or no
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;

    /// Status line that needs no answer
    fn notice(&mut self, message: &str);
}

/// Whether the wizard should run
///
/// Explicitly requested, or nothing was configured on the command line and a
/// person is at the terminal.
pub fn should_run(interactive: bool, invocation: &Invocation) -> bool {
    interactive || (is_unconfigured(invocation) && std::io::stdin().is_terminal())
}

fn is_unconfigured(invocation: &Invocation) -> bool {
    invocation.folders.is_empty()
        && invocation.prompt.is_none()
        && invocation.provider.is_none()
        && invocation.servers.is_none()
}

/// Fill in every value the invocation is missing
pub fn complete(mut invocation: Invocation, prompter: &mut dyn Prompter) -> Result<Invocation> {
    let catalog = Catalog::builtin();

    if invocation.provider.is_none() {
        let items: Vec<String> = ModelProvider::ALL
            .iter()
            .map(|p| p.label().to_string())
            .collect();
        let default = ModelProvider::ALL
            .iter()
            .position(|p| *p == ModelProvider::default())
            .unwrap_or(0);
        let choice = prompter.select("Select model provider", &items, default)?;
        let provider = ModelProvider::ALL.get(choice).copied().unwrap_or_default();
        invocation.provider = Some(provider.as_str().to_string());
    }

    if invocation.servers.is_none() {
        let items: Vec<String> = catalog
            .entries()
            .iter()
            .map(|e| format!("{}. {}: {}", e.ordinal, e.display_name, e.description))
            .collect();
        let defaults: Vec<bool> = catalog
            .entries()
            .iter()
            .map(|e| e.id == DEFAULT_SERVER_ID)
            .collect();
        let chosen = prompter.multi_select("Select MCP servers", &items, &defaults)?;
        let ids: Vec<&str> = chosen
            .into_iter()
            .filter_map(|i| catalog.entries().get(i).map(|e| e.id))
            .collect();
        invocation.servers = Some(ids.join(","));
    }

    let needs_folders = invocation
        .servers
        .as_deref()
        .is_some_and(|raw| catalog.resolve(&parse_tokens(raw)).requires_folders());
    if invocation.folders.is_empty() && needs_folders {
        invocation.folders = ask_folders(prompter)?;
    }

    if invocation.prompt.is_none() {
        invocation.prompt = Some(prompter.input("Prompt", Some(DEFAULT_PROMPT))?);
    }

    if !invocation.chat {
        invocation.chat = prompter.confirm("Enable follow-up questions?", true)?;
    }

    Ok(invocation)
}

/// Ask for folders until an empty line; non-directories are refused
fn ask_folders(prompter: &mut dyn Prompter) -> Result<Vec<PathBuf>> {
    prompter.notice("Enter folder paths to analyze (empty line to finish)");
    let mut folders = Vec::new();

    loop {
        let answer = prompter.input("Folder path", None)?;
        let answer = answer.trim();
        if answer.is_empty() {
            break;
        }

        let path = PathBuf::from(answer);
        if path.is_dir() {
            prompter.notice(&format!("Added: {}", path.display()));
            folders.push(path);
        } else {
            prompter.notice(&format!("Not a directory: {}", path.display()));
        }
    }

    Ok(folders)
}

/// Terminal prompter built on dialoguer
#[derive(Default)]
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl std::fmt::Debug for DialoguerPrompter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialoguerPrompter").finish_non_exhaustive()
    }
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for DialoguerPrompter {
    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<usize> {
        Ok(Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()?)
    }

    fn multi_select(
        &mut self,
        prompt: &str,
        items: &[String],
        defaults: &[bool],
    ) -> Result<Vec<usize>> {
        Ok(MultiSelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .defaults(defaults)
            .interact()?)
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme);
        input = input.with_prompt(prompt);
        input = match default {
            Some(default) => input.default(default.to_string()),
            None => input.allow_empty(true),
        };
        Ok(input.interact_text()?)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    fn notice(&mut self, message: &str) {
        Term::stderr()
            .write_line(&style(message).blue().to_string())
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    /// Replays canned answers and records every question
    #[derive(Default)]
    struct ScriptedPrompter {
        selects: VecDeque<usize>,
        multi: VecDeque<Vec<usize>>,
        inputs: VecDeque<String>,
        confirms: VecDeque<bool>,
        asked: Vec<String>,
        notices: Vec<String>,
    }

    impl Prompter for ScriptedPrompter {
        fn select(&mut self, prompt: &str, _items: &[String], default: usize) -> Result<usize> {
            self.asked.push(prompt.to_string());
            Ok(self.selects.pop_front().unwrap_or(default))
        }

        fn multi_select(
            &mut self,
            prompt: &str,
            _items: &[String],
            defaults: &[bool],
        ) -> Result<Vec<usize>> {
            self.asked.push(prompt.to_string());
            Ok(self.multi.pop_front().unwrap_or_else(|| {
                defaults
                    .iter()
                    .enumerate()
                    .filter_map(|(i, on)| on.then_some(i))
                    .collect()
            }))
        }

        fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
            self.asked.push(prompt.to_string());
            Ok(self
                .inputs
                .pop_front()
                .unwrap_or_else(|| default.unwrap_or_default().to_string()))
        }

        fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
            self.asked.push(prompt.to_string());
            Ok(self.confirms.pop_front().unwrap_or(default))
        }

        fn notice(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }
    }

    #[test]
    fn test_defaults_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let mut prompter = ScriptedPrompter {
            inputs: [dir.path().display().to_string(), String::new()].into(),
            ..Default::default()
        };

        let inv = complete(Invocation::default(), &mut prompter).unwrap();
        assert_eq!(inv.provider.as_deref(), Some("ollama"));
        assert_eq!(inv.servers.as_deref(), Some("filesystem"));
        assert_eq!(inv.folders, vec![dir.path().to_path_buf()]);
        assert_eq!(inv.prompt.as_deref(), Some(DEFAULT_PROMPT));
        assert!(inv.chat);
    }

    #[test]
    fn test_only_missing_values_are_asked() {
        let mut prompter = ScriptedPrompter::default();
        let given = Invocation {
            provider: Some("claude".to_string()),
            servers: Some("git".to_string()),
            prompt: Some("show the log".to_string()),
            chat: true,
            ..Default::default()
        };

        let inv = complete(given.clone(), &mut prompter).unwrap();
        assert_eq!(inv, given);
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_choices_map_to_ids() {
        let mut prompter = ScriptedPrompter {
            selects: [1].into(),
            multi: [vec![2, 6]].into(),
            inputs: ["list branches".to_string()].into(),
            confirms: [false].into(),
            ..Default::default()
        };

        let inv = complete(Invocation::default(), &mut prompter).unwrap();
        assert_eq!(inv.provider.as_deref(), Some("claude"));
        assert_eq!(inv.servers.as_deref(), Some("git,memory"));
        assert!(inv.folders.is_empty());
        assert_eq!(inv.prompt.as_deref(), Some("list branches"));
        assert!(!inv.chat);
        assert!(!prompter.asked.iter().any(|q| q == "Folder path"));
    }

    #[test]
    fn test_invalid_folders_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let mut prompter = ScriptedPrompter {
            inputs: [
                missing.display().to_string(),
                dir.path().display().to_string(),
                "  ".to_string(),
            ]
            .into(),
            ..Default::default()
        };

        let folders = ask_folders(&mut prompter).unwrap();
        assert_eq!(folders, vec![dir.path().to_path_buf()]);
        assert!(prompter.notices.iter().any(|n| n.starts_with("Not a directory")));
    }

    #[test]
    fn test_is_unconfigured() {
        assert!(is_unconfigured(&Invocation::default()));
        assert!(!is_unconfigured(&Invocation {
            prompt: Some("hi".to_string()),
            ..Default::default()
        }));
        assert!(should_run(true, &Invocation {
            prompt: Some("hi".to_string()),
            ..Default::default()
        }));
    }
}
