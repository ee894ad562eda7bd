//! CLI module containing argument parsing and configuration

pub mod args;
pub mod config;

pub use args::{Args, Command, ScanOverrides, TargetsArg};
pub use config::{ConfigError, Settings};
