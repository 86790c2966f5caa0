//! Error types for the MCP assistant

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::mcp::ExternalMcpError;
use crate::provider::ProviderError;

/// Broad error categories
///
/// Each category maps to a distinct process exit code so scripts can tell a
/// bad invocation apart from a missing prerequisite or a failed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unknown server token, unsupported provider, empty server list
    Configuration,
    /// Missing environment variable, missing or invalid folder
    Prerequisite,
    /// Failure while the session is running
    Session,
}

impl ErrorCategory {
    /// Process exit code for this category
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCategory::Session => 1,
            ErrorCategory::Configuration => 2,
            ErrorCategory::Prerequisite => 3,
        }
    }
}

/// A single problem with the requested configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    /// Token that matches no catalog id or ordinal
    UnknownServer(String),
    /// Provider identity outside the supported set
    UnsupportedProvider(String),
    /// `--mcp` was given but contained no tokens
    NoServersSelected,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::UnknownServer(token) => write!(
                f,
                "unknown MCP server '{token}' (run with --list-mcps to see the catalog)"
            ),
            ConfigIssue::UnsupportedProvider(provider) => write!(
                f,
                "unsupported model provider '{provider}' (expected one of: ollama, claude)"
            ),
            ConfigIssue::NoServersSelected => write!(f, "no MCP servers selected"),
        }
    }
}

/// A single unmet prerequisite
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A selected server needs at least one folder
    FolderRequired,
    /// A required environment variable is unset or empty
    MissingEnv {
        /// Variable name
        var: String,
        /// Server or provider that needs it
        required_by: String,
    },
    /// A supplied folder does not exist
    FolderNotFound(PathBuf),
    /// A supplied folder exists but is not a directory
    NotADirectory(PathBuf),
    /// A credential is present but malformed
    InvalidCredential {
        /// Variable name
        var: String,
        /// What is wrong with it
        reason: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::FolderRequired => write!(
                f,
                "folder required: the filesystem server needs at least one --folder"
            ),
            Violation::MissingEnv { var, required_by } => write!(
                f,
                "missing environment variable `{var}` for capability `{required_by}`"
            ),
            Violation::FolderNotFound(path) => {
                write!(f, "folder not found: `{}`", path.display())
            }
            Violation::NotADirectory(path) => {
                write!(f, "not a directory: `{}`", path.display())
            }
            Violation::InvalidCredential { var, reason } => {
                write!(f, "invalid value for `{var}`: {reason}")
            }
        }
    }
}

fn bullet_list<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("\n  - {item}"))
        .collect::<String>()
}

/// Main error type for the assistant
#[derive(Debug, Error)]
pub enum AppError {
    // === Configuration errors ===
    /// One or more configuration problems, all reported together
    #[error("invalid configuration:{}", bullet_list(.0))]
    Configuration(Vec<ConfigIssue>),

    // === Prerequisite errors ===
    /// One or more unmet prerequisites, all reported together
    #[error("unmet prerequisites:{}", bullet_list(.0))]
    Prerequisites(Vec<Violation>),

    // === Session errors ===
    /// MCP server failure
    #[error("MCP server error: {0}")]
    Mcp(#[from] ExternalMcpError),

    /// Model provider failure
    #[error("model provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The model kept requesting tools without answering
    #[error("model exceeded {0} requests in a single round without answering")]
    ToolStepLimit(usize),

    /// Interactive prompt failure
    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for the assistant
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Get the category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Configuration(_) => ErrorCategory::Configuration,
            AppError::Prerequisites(_) => ErrorCategory::Prerequisite,
            AppError::Mcp(_)
            | AppError::Provider(_)
            | AppError::ToolStepLimit(_)
            | AppError::Prompt(_)
            | AppError::Io(_)
            | AppError::Json(_)
            | AppError::Internal(_) => ErrorCategory::Session,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    /// Check if this error was caused by the invocation rather than the session
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Configuration | ErrorCategory::Prerequisite
        )
    }

    // === Constructor helpers ===

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_configuration_error_lists_every_issue() {
        let err = AppError::Configuration(vec![
            ConfigIssue::UnknownServer("unknown1".to_string()),
            ConfigIssue::UnknownServer("unknown2".to_string()),
        ]);

        let message = err.to_string();
        assert!(message.starts_with("invalid configuration:"));
        assert!(message.contains("'unknown1'"));
        assert!(message.contains("'unknown2'"));
        assert_eq!(message.lines().count(), 3);
    }

    #[test]
    fn test_violation_display() {
        assert_eq!(
            Violation::MissingEnv {
                var: "BRAVE_API_KEY".to_string(),
                required_by: "brave-search".to_string(),
            }
            .to_string(),
            "missing environment variable `BRAVE_API_KEY` for capability `brave-search`"
        );
        assert_eq!(
            Violation::FolderNotFound(PathBuf::from("/nope")).to_string(),
            "folder not found: `/nope`"
        );
        assert!(Violation::FolderRequired.to_string().starts_with("folder required"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::Configuration(vec![]).exit_code(), 2);
        assert_eq!(AppError::Prerequisites(vec![]).exit_code(), 3);
        assert_eq!(AppError::ToolStepLimit(25).exit_code(), 1);
        assert_eq!(AppError::internal("oops").exit_code(), 1);
    }

    #[test]
    fn test_is_client_error() {
        assert!(AppError::Configuration(vec![ConfigIssue::NoServersSelected]).is_client_error());
        assert!(AppError::Prerequisites(vec![Violation::FolderRequired]).is_client_error());
        assert!(!AppError::internal("oops").is_client_error());
        assert!(!AppError::ToolStepLimit(3).is_client_error());
    }
}
