//! Logging setup and error tracing helpers

mod error_ext;
mod logging;

pub use error_ext::{ErrorTraceExt, ResultTraceExt, error_chain};
pub use logging::{build_env_filter, init_logging, shutdown_otel};
