//! Configuration file support

use clap::ValueEnum;
use parley_chat::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, ReadinessStrategy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for parley
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model to use
    pub model: Option<String>,
    /// Replaces the built-in greeting
    pub greeting: Option<String>,
    /// Alternative to ANTHROPIC_API_KEY
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
    pub readiness: ReadinessSettings,
}

/// How long, and how, a turn waits for the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessSettings {
    pub mode: Option<ReadinessMode>,
    pub timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessMode {
    #[default]
    Signal,
    Poll,
}

impl ReadinessSettings {
    pub fn timeout(&self) -> Duration {
        self.timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn strategy(&self) -> ReadinessStrategy {
        match self.mode.unwrap_or_default() {
            ReadinessMode::Signal => ReadinessStrategy::Signal,
            ReadinessMode::Poll => ReadinessStrategy::Poll {
                interval: self
                    .poll_interval_ms
                    .filter(|ms| *ms > 0)
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_POLL_INTERVAL),
            },
        }
    }
}

impl Config {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PARLEY_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load the config file, falling back to defaults if it is missing or broken
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Write the example config unless a file already exists
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, example_config())?;
        Ok(path)
    }

    /// API key from the config, then the environment
    pub fn api_key(&self) -> Option<String> {
        parley_ai::providers::get_api_key(self.api_key.as_deref(), "ANTHROPIC_API_KEY").ok()
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# parley configuration file
# Place at ~/.config/parley/config.toml (Linux/Mac) or %APPDATA%\parley\config.toml (Windows)

# Model to use
model = "claude-sonnet-4-6"

# First message of every conversation (optional)
# greeting = "Hello! What can I do for you?"

# Whether to use TUI mode by default (true by default)
# Set to false for simple stdin/stdout mode
tui = true

# Maximum tokens per reply
# max_tokens = 4096

# API endpoint (optional)
# base_url = "https://api.anthropic.com"

# API key (optional - ANTHROPIC_API_KEY is used otherwise)
# api_key = "sk-ant-..."

# How a message waits for the backend to come up
[readiness]
# "signal" wakes as soon as the backend is ready, "poll" checks on an interval
mode = "signal"
timeout_ms = 3000
poll_interval_ms = 100
"#
}
