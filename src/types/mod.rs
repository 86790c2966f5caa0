//! Public types for the MCP assistant
//!
//! This module contains the shared types used across the crate.

mod env;
mod error;
mod session;

pub use env::{EnvSource, ProcessEnv};
pub use error::{AppError, ConfigIssue, ErrorCategory, Result, Violation};
pub use session::TokenUsage;
