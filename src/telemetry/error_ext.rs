//! Error tracing extensions
//!
//! Logs an error together with its category and source chain.

use std::error::Error as StdError;

use crate::types::AppError;

/// Extension trait for adding tracing context to errors
pub trait ErrorTraceExt {
    /// Log error with its category, exit code and error chain
    fn trace_error(&self) -> &Self;
}

/// Messages of every source below `error`, outermost first
pub fn error_chain(error: &dyn StdError) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = error.source();
    while let Some(source) = current {
        chain.push(source.to_string());
        current = source.source();
    }
    chain
}

impl ErrorTraceExt for AppError {
    fn trace_error(&self) -> &Self {
        let chain = error_chain(self);

        if self.is_client_error() {
            tracing::warn!(
                error = %self,
                category = ?self.category(),
                exit_code = self.exit_code(),
                "Invocation rejected"
            );
        } else {
            tracing::error!(
                error = %self,
                category = ?self.category(),
                exit_code = self.exit_code(),
                error_chain_len = chain.len(),
                error_chain = ?chain,
                "Session failed"
            );
        }

        self
    }
}

/// Extension trait for Result types
pub trait ResultTraceExt<T>: Sized {
    /// Convert the error to an [`AppError`] and log it
    fn trace_context(self) -> Result<T, AppError>;
}

impl<T, E> ResultTraceExt<T> for Result<T, E>
where
    AppError: From<E>,
{
    fn trace_context(self) -> Result<T, AppError> {
        self.map_err(|e| {
            let app_error = AppError::from(e);
            app_error.trace_error();
            app_error
        })
    }
}
