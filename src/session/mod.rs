//! Session preparation and runtime
//!
//! This module handles:
//! - Validating an invocation into a [`SessionConfig`] (`config`)
//! - Prerequisite checks on folders, environment and credentials
//! - Assembling launch specs and the model descriptor ([`SessionPlan`])
//! - The running [`AgentSession`] and its token usage

mod agent_session;
mod assembler;
mod config;
pub mod prerequisites;
mod usage;

pub use agent_session::{AgentSession, MAX_MODEL_CALLS_PER_ROUND, RoundOutput};
pub use assembler::{SessionPlan, assemble, launch_spec, system_prompt};
pub use config::{DEFAULT_PROMPT, Invocation, SessionConfig, prepare};
pub use usage::UsageTracker;
