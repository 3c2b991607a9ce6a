//! Configuration loader and validator for the campaign stream client.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub stream: Stream,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// Remote producer endpoints and reconnect policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stream {
    pub endpoint: String,
    pub batch_endpoint: String,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_retry_delay_ms() -> u64 {
    3000
}

fn default_max_retries() -> u32 {
    5
}

impl Stream {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl App {
    /// `data_dir` with a leading `~/` expanded against `HOME`.
    pub fn resolved_data_dir(&self) -> String {
        match self.data_dir.strip_prefix("~/") {
            Some(rest) => match std::env::var("HOME") {
                Ok(home) => format!("{}/{}", home.trim_end_matches('/'), rest),
                Err(_) => self.data_dir.clone(),
            },
            None => self.data_dir.clone(),
        }
    }

    /// Default SQLite URL inside the data directory. `DATABASE_URL` wins when set.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/campaigns.db", self.resolved_data_dir()))
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(self.app.resolved_data_dir())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    let endpoint = cfg.stream.endpoint.trim();
    if endpoint.is_empty() {
        return Err(ConfigError::Invalid("stream.endpoint must be non-empty"));
    }
    if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
        return Err(ConfigError::Invalid(
            "stream.endpoint must be a ws:// or wss:// URL",
        ));
    }

    let batch = cfg.stream.batch_endpoint.trim();
    if batch.is_empty() {
        return Err(ConfigError::Invalid("stream.batch_endpoint must be non-empty"));
    }
    if !(batch.starts_with("http://") || batch.starts_with("https://")) {
        return Err(ConfigError::Invalid(
            "stream.batch_endpoint must be an http:// or https:// URL",
        ));
    }

    if cfg.stream.retry_delay_ms == 0 {
        return Err(ConfigError::Invalid("stream.retry_delay_ms must be > 0"));
    }
    // max_retries of 0 is allowed: the first drop is then terminal.

    Ok(())
}

/// Returns the example YAML content.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

stream:
  endpoint: "wss://campaign-crawler-app.onrender.com/ws/crawl"
  batch_endpoint: "https://campaign-crawler-app.onrender.com/crawl"
  retry_delay_ms: 3000
  max_retries: 5
"#
}
