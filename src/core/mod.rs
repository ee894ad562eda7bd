//! Core services and infrastructure

pub mod error_handling;
pub mod logging;
pub mod styles; // centralized styling palette for CLI output
pub mod validation;
