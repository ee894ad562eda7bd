//! Validation utilities for target ids and credentials
//!
//! Shared shape checks used by the target loader, the ledger integrity check
//! and the ingestion step.

use once_cell::sync::Lazy;
use regex::Regex;
use std::net::IpAddr;

/// Maximum length of an account name accepted by ingestion
pub const MAX_USERNAME_LEN: usize = 32;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z_][a-z0-9_-]*[$]?$").expect("valid username regex")
});

static HOSTNAME_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid hostname regex")
});

/// Validation failure with a human-readable explanation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn details(&self) -> &str {
        &self.message
    }
}

impl crate::core::error_handling::ContextualError for ValidationError {
    fn is_user_actionable(&self) -> bool {
        true
    }
}

/// Check that `id` looks like a host identifier: an IP address or a DNS name
pub fn validate_target_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::new("target id is empty"));
    }
    if id.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    // Dotted quads that failed to parse are malformed addresses, not hostnames
    if id.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(ValidationError::new(format!(
            "'{}' is not a valid IP address",
            id
        )));
    }
    if id.len() > 253 {
        return Err(ValidationError::new(format!(
            "'{}' is longer than 253 characters",
            id
        )));
    }
    if id.split('.').all(|label| HOSTNAME_LABEL_RE.is_match(label)) {
        Ok(())
    } else {
        Err(ValidationError::new(format!(
            "'{}' is neither an IP address nor a hostname",
            id
        )))
    }
}

/// Whether `name` is an acceptable Linux-style account name
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_USERNAME_LEN && USERNAME_RE.is_match(name)
}

/// Validate positive integer value
pub fn validate_positive_int(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}
