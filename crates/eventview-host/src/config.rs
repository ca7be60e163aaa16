//! Host configuration read from the environment.

use std::str::FromStr;

use crate::error::HostError;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = HostError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(HostError::Config(format!(
                "EVENTVIEW_LOG_FORMAT must be json or pretty, got {other:?}"
            ))),
        }
    }
}

/// Settings for one host run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Whether views drop existing data when initialized.
    pub purge_on_start: bool,
    /// Number of sample accounts to open.
    pub demo_accounts: usize,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            purge_on_start: false,
            demo_accounts: 3,
            log_format: LogFormat::Json,
        }
    }
}

impl HostConfig {
    /// Reads `EVENTVIEW_PURGE_ON_START`, `EVENTVIEW_DEMO_ACCOUNTS` and
    /// `EVENTVIEW_LOG_FORMAT`, falling back to defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Config` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, HostError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Config` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HostError> {
        let defaults = Self::default();

        let purge_on_start = match lookup("EVENTVIEW_PURGE_ON_START") {
            Some(value) => parse_bool("EVENTVIEW_PURGE_ON_START", &value)?,
            None => defaults.purge_on_start,
        };

        let demo_accounts = match lookup("EVENTVIEW_DEMO_ACCOUNTS") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&count| count >= 1)
                .ok_or_else(|| {
                    HostError::Config(format!(
                        "EVENTVIEW_DEMO_ACCOUNTS must be a whole number of at least 1, got {value:?}"
                    ))
                })?,
            None => defaults.demo_accounts,
        };

        let log_format = match lookup("EVENTVIEW_LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            purge_on_start,
            demo_accounts,
            log_format,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, HostError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HostError::Config(format!("{key} must be a boolean, got {value:?}"))),
    }
}
