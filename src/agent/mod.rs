//! Assistant entry point
//!
//! Drives one invocation from parsed arguments to a finished conversation.

mod runner;

pub use runner::{RunOutcome, run_with_cli};
