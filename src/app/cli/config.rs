//! TOML configuration file parsing and loading
//!
//! Settings start from built-in defaults, then the configuration file is
//! applied, then command-line flags. Keys may sit at the top level or inside
//! their `[scan]`, `[health]`, `[pause]` or `[tester]` table; the table wins
//! when both are present.

use super::args::{Args, ScanOverrides};
use crate::core::error_handling::ContextualError;
use crate::health::HealthConfig;
use crate::pause::DEFAULT_POLL_INTERVAL;
use crate::scanner::tester::DEFAULT_SUCCESS_PATTERN;
use crate::scanner::ScanConfig;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default tester invocation (netexec over ssh)
pub const DEFAULT_TESTER_COMMAND: [&str; 12] = [
    "nxc",
    "ssh",
    "{target}",
    "-u",
    "{users_file}",
    "-p",
    "{secret}",
    "--timeout",
    "{timeout}",
    "-t",
    "{threads}",
    "--continue-on-success",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {path}")]
    NotFound { path: String },

    #[error("Error reading configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing configuration file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, ConfigError::Read { .. })
    }
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub scan: ScanConfig,
    pub state_dir: PathBuf,
    pub health: HealthConfig,
    pub pause_poll: Duration,
    pub tester_command: Vec<String>,
    pub success_pattern: String,
    pub threads: usize,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub log_file: Option<PathBuf>,
    pub color: Option<bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            state_dir: PathBuf::from("."),
            health: HealthConfig::default(),
            pause_poll: DEFAULT_POLL_INTERVAL,
            tester_command: DEFAULT_TESTER_COMMAND.iter().map(|s| s.to_string()).collect(),
            success_pattern: DEFAULT_SUCCESS_PATTERN.to_string(),
            threads: 1,
            log_level: None,
            log_format: None,
            log_file: None,
            color: None,
        }
    }
}

/// Default location: `<config_dir>/Credsweep/credsweep.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Credsweep").join("credsweep.toml"))
}

fn lookup<'a>(config: &'a toml::Table, table: &str, key: &str) -> Option<&'a toml::Value> {
    config
        .get(table)
        .and_then(|v| v.as_table())
        .and_then(|t| t.get(key))
        .or_else(|| config.get(key))
}

fn get_str<'a>(config: &'a toml::Table, table: &str, key: &str) -> Result<Option<&'a str>, ConfigError> {
    match lookup(config, table, key) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, "expected a string")),
    }
}

fn get_bool(config: &toml::Table, table: &str, key: &str) -> Result<Option<bool>, ConfigError> {
    match lookup(config, table, key) {
        None => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, "expected true or false")),
    }
}

fn get_count(config: &toml::Table, table: &str, key: &str) -> Result<Option<u64>, ConfigError> {
    match lookup(config, table, key) {
        None => Ok(None),
        Some(v) => match v.as_integer() {
            Some(n) if n >= 0 => Ok(Some(n as u64)),
            Some(_) => Err(ConfigError::invalid(key, "must not be negative")),
            None => Err(ConfigError::invalid(key, "expected an integer")),
        },
    }
}

fn get_secs(config: &toml::Table, table: &str, key: &str) -> Result<Option<Duration>, ConfigError> {
    Ok(get_count(config, table, key)?.map(Duration::from_secs))
}

impl Settings {
    /// Defaults plus the configuration file, if any
    ///
    /// An explicitly named file must exist; the default location is optional.
    pub async fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        let config_path = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.display().to_string(),
                    });
                }
                Some(path.to_path_buf())
            }
            None => default_config_path().filter(|p| p.exists()),
        };

        if let Some(path) = config_path {
            let display = path.display().to_string();
            let contents =
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| ConfigError::Read {
                        path: display.clone(),
                        source,
                    })?;
            let config = toml::from_str::<toml::Table>(&contents).map_err(|source| {
                ConfigError::Parse {
                    path: display.clone(),
                    source,
                }
            })?;
            settings.apply_toml_values(&config)?;
            log::debug!("Loaded configuration from {}", display);
        }
        Ok(settings)
    }

    /// Apply TOML configuration values over the current settings
    pub fn apply_toml_values(&mut self, config: &toml::Table) -> Result<(), ConfigError> {
        // [scan]
        if let Some(size) = get_count(config, "scan", "batch-size")? {
            self.scan.batch_size = size as usize;
        }
        if let Some(delay) = get_secs(config, "scan", "batch-delay-secs")? {
            self.scan.batch_delay = delay;
        }
        if let Some(timeout) = get_secs(config, "scan", "attempt-timeout-secs")? {
            self.scan.attempt_timeout = timeout;
        }
        if let Some(dir) = get_str(config, "scan", "state-dir")? {
            self.state_dir = PathBuf::from(dir);
        }

        // [health]
        if let Some(enabled) = get_bool(config, "health", "enabled")? {
            self.health.enabled = enabled;
        }
        if let Some(interface) = get_str(config, "health", "interface")? {
            self.health.interface = interface.to_string();
        }
        if let Some(address) = get_str(config, "health", "probe-address")? {
            self.health.probe_address = address.to_string();
        }
        if let Some(timeout) = get_secs(config, "health", "probe-timeout-secs")? {
            self.health.probe_timeout = timeout;
        }
        if let Some(interval) = get_secs(config, "health", "check-interval-secs")? {
            self.health.check_interval = interval;
        }
        if let Some(settle) = get_secs(config, "health", "settle-delay-secs")? {
            self.health.settle_delay = settle;
        }
        // `poll-interval-secs` exists in both tables; only read the qualified one
        if let Some(poll) = config
            .get("health")
            .and_then(|v| v.as_table())
            .map(|t| get_secs(t, "", "poll-interval-secs"))
            .transpose()?
            .flatten()
        {
            self.health.poll_interval = poll;
        }

        // [pause]
        if let Some(poll) = config
            .get("pause")
            .and_then(|v| v.as_table())
            .map(|t| get_secs(t, "", "poll-interval-secs"))
            .transpose()?
            .flatten()
        {
            self.pause_poll = poll;
        }

        // [tester]
        if let Some(value) = lookup(config, "tester", "command") {
            // A single string is split on whitespace; an array is taken verbatim
            let argv: Vec<String> = if let Some(line) = value.as_str() {
                if line.contains(['"', '\'']) {
                    return Err(ConfigError::invalid(
                        "command",
                        "quoted arguments need the array form",
                    ));
                }
                line.split_whitespace().map(str::to_string).collect()
            } else if let Some(items) = value.as_array() {
                items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| ConfigError::invalid("command", "expected strings"))
                    })
                    .collect::<Result<_, _>>()?
            } else {
                return Err(ConfigError::invalid(
                    "command",
                    "expected a string or a list of strings",
                ));
            };
            self.tester_command = argv;
        }
        if let Some(pattern) = get_str(config, "tester", "success-pattern")? {
            self.success_pattern = pattern.to_string();
        }
        if let Some(threads) = get_count(config, "tester", "threads")? {
            self.threads = threads as usize;
        }

        // logging and output
        if let Some(level) = config.get("log-level").and_then(|v| v.as_str()) {
            self.log_level = Some(level.to_string());
        }
        if let Some(format) = config.get("log-format").and_then(|v| v.as_str()) {
            self.log_format = Some(format.to_string());
        }
        if let Some(file) = config.get("log-file").and_then(|v| v.as_str()) {
            self.log_file = log_file_setting(file);
        }
        if let Some(color) = config.get("color").and_then(|v| v.as_bool()) {
            self.color = Some(color);
        }
        Ok(())
    }

    /// Command-line flags take precedence over the file
    pub fn apply_overrides(&mut self, args: &Args) {
        if let Some(dir) = &args.state_dir {
            self.state_dir = dir.clone();
        }
        if let Some(level) = &args.log_level {
            self.log_level = Some(level.clone());
        }
        if let Some(format) = &args.log_format {
            self.log_format = Some(format.clone());
        }
        if let Some(file) = &args.log_file {
            self.log_file = log_file_setting(&file.to_string_lossy());
        }
        if args.color {
            self.color = Some(true);
        }
        if args.no_color {
            self.color = Some(false);
        }
        if let Some(scan) = args.command.scan_overrides() {
            self.apply_scan_overrides(scan);
        }
    }

    fn apply_scan_overrides(&mut self, scan: &ScanOverrides) {
        if let Some(size) = scan.batch_size {
            self.scan.batch_size = size;
        }
        if let Some(delay) = scan.batch_delay {
            self.scan.batch_delay = Duration::from_secs(delay);
        }
        if let Some(timeout) = scan.attempt_timeout {
            self.scan.attempt_timeout = Duration::from_secs(timeout);
        }
        if let Some(threads) = scan.threads {
            self.threads = threads;
        }
        if let Some(interface) = &scan.interface {
            self.health.interface = interface.clone();
        }
        if scan.no_health_check {
            self.health.enabled = false;
        }
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.batch_size == 0 {
            return Err(ConfigError::invalid("batch-size", "must be at least 1"));
        }
        if self.threads == 0 {
            return Err(ConfigError::invalid("threads", "must be at least 1"));
        }
        if self
            .tester_command
            .first()
            .map_or(true, |p| p.trim().is_empty())
        {
            return Err(ConfigError::invalid("command", "must name a program"));
        }
        if let Err(e) = regex::Regex::new(&self.success_pattern) {
            return Err(ConfigError::invalid("success-pattern", e.to_string()));
        }
        if self.health.enabled {
            if self.health.interface.trim().is_empty() {
                return Err(ConfigError::invalid("interface", "must not be empty"));
            }
            if self.health.probe_address.trim().is_empty() {
                return Err(ConfigError::invalid("probe-address", "must not be empty"));
            }
        }
        Ok(())
    }

    /// Explicit setting, else colour when both output streams are terminals
    pub fn use_color(&self) -> bool {
        self.color
            .unwrap_or_else(|| std::io::stdout().is_terminal() && std::io::stderr().is_terminal())
    }
}

/// Magic values "none" and "-" disable file logging
fn log_file_setting(value: &str) -> Option<PathBuf> {
    if value.eq_ignore_ascii_case("none") || value == "-" {
        None
    } else {
        Some(PathBuf::from(value))
    }
}
