use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::chat_session::ChatSettings;
use crate::core::constants::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::core::readiness::ReadyPolicy;

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Platform endpoint, e.g. "https://platform.example/v1"
    pub base_url: Option<String>,
    /// Model id selected at startup
    pub default_model: Option<String>,
    /// Ask the platform for test-mode (unbilled) completions
    pub test_mode: Option<bool>,
    /// Delay between readiness checks, in milliseconds
    pub ready_interval_ms: Option<u64>,
    /// Readiness checks before giving up
    pub ready_attempts: Option<u32>,
    /// `tracing` filter directive used when RUST_LOG is unset
    pub log_filter: Option<String>,
    /// Store the session token in the OS keyring (default on)
    pub keyring: Option<bool>,
}

/// Keys accepted by `set` and `unset`.
pub const CONFIG_KEYS: &[&str] = &[
    "base-url",
    "default-model",
    "test-mode",
    "ready-interval-ms",
    "ready-attempts",
    "log-filter",
    "keyring",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValueError {
    UnknownKey(String),
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValueError::UnknownKey(key) => {
                write!(f, "Unknown config key: {key} (expected one of {})", CONFIG_KEYS.join(", "))
            }
            ConfigValueError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {key}: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigValueError {}

/// Get a user-friendly display string for a path, using `~` for the home
/// directory on Unix-like systems.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn default_model(&self) -> &str {
        self.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn use_keyring(&self) -> bool {
        self.keyring.unwrap_or(true)
    }

    pub fn ready_policy(&self) -> ReadyPolicy {
        let defaults = ReadyPolicy::default();
        ReadyPolicy {
            interval: self
                .ready_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
            max_attempts: self.ready_attempts.unwrap_or(defaults.max_attempts),
        }
    }

    /// Chat settings, with an optional command-line model override.
    pub fn chat_settings(&self, model_override: Option<&str>) -> ChatSettings {
        ChatSettings {
            default_model: model_override
                .filter(|model| !model.trim().is_empty())
                .unwrap_or(self.default_model())
                .to_string(),
            test_mode: self.test_mode.unwrap_or(false),
            ready_policy: self.ready_policy(),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigValueError> {
        let invalid = || ConfigValueError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(invalid());
        }
        match key {
            "base-url" => self.base_url = Some(value.to_string()),
            "default-model" => self.default_model = Some(value.to_string()),
            "test-mode" => self.test_mode = Some(parse_bool(value).ok_or_else(invalid)?),
            "ready-interval-ms" => {
                self.ready_interval_ms = Some(value.parse().map_err(|_| invalid())?)
            }
            "ready-attempts" => {
                let attempts: u32 = value.parse().map_err(|_| invalid())?;
                if attempts == 0 {
                    return Err(invalid());
                }
                self.ready_attempts = Some(attempts);
            }
            "log-filter" => self.log_filter = Some(value.to_string()),
            "keyring" => self.keyring = Some(parse_bool(value).ok_or_else(invalid)?),
            _ => return Err(ConfigValueError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), ConfigValueError> {
        match key {
            "base-url" => self.base_url = None,
            "default-model" => self.default_model = None,
            "test-mode" => self.test_mode = None,
            "ready-interval-ms" => self.ready_interval_ms = None,
            "ready-attempts" => self.ready_attempts = None,
            "log-filter" => self.log_filter = None,
            "keyring" => self.keyring = None,
            _ => return Err(ConfigValueError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}
