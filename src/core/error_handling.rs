//! Generic error handling utilities
//!
//! Every component error (target list, ledger, tester, recovery, config)
//! reports whether the operator can fix it directly. Fatal paths in the
//! startup code log through [`log_error_with_context`] so input mistakes show
//! their own message while system failures show the operation that failed.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`; otherwise it returns `None`. The default message is the
/// error's `Display` output.
pub trait ContextualError: std::error::Error {
    /// True if the error carries a message the operator can act on
    /// (malformed target file, bad config value, missing tester binary)
    fn is_user_actionable(&self) -> bool;

    /// The operator-facing message for user-actionable errors
    fn user_message(&self) -> Option<String> {
        self.is_user_actionable().then(|| self.to_string())
    }
}

/// Log errors with appropriate detail level based on error specificity
///
/// * `error` - The error to report
/// * `operation_context` - Human-readable description of the operation that failed
///
/// ```rust,no_run
/// # use credsweep::core::error_handling::log_error_with_context;
/// # use credsweep::core::validation::ValidationError;
/// let err = ValidationError::new("batch-size must be at least 1");
/// log_error_with_context(&err, "Loading configuration");
/// // Logs: "FATAL: batch-size must be at least 1"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) => log::error!("FATAL: {}", user_msg),
        _ => log::error!("FATAL: {}: {}", operation_context, error),
    }
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

/// Message to show on stderr for a fatal error, following the same rules as
/// [`log_error_with_context`]
pub fn fatal_message<E: ContextualError + std::fmt::Display>(
    error: &E,
    operation_context: &str,
) -> String {
    match error.user_message() {
        Some(user_msg) => user_msg,
        _ => format!("{}: {}", operation_context, error),
    }
}
