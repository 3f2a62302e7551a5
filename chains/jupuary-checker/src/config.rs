use crate::checker::DEFAULT_ALLOCATION_URL;
use anyhow::{Context, Result};
use config::{Config, File, FileFormat};
use core_logic::{validate_rpc_url, ConfigError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.json";
pub const ACCOUNTS_FILE: &str = "accounts.txt";
pub const PROXIES_FILE: &str = "proxies.txt";
pub const RETAINED_FILE: &str = "without_authority.txt";
pub const CHANGED_FILE: &str = "with_authority.txt";

#[derive(Debug, Clone, Deserialize)]
pub struct CheckerConfig {
    pub rpc_url: String,
    #[serde(default = "default_allocation_url")]
    pub allocation_url: String,
    /// Base pause between failed attempts; 0 retries immediately.
    #[serde(default)]
    pub retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_allocation_url() -> String {
    DEFAULT_ALLOCATION_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl CheckerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Json))
            .build()
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: Self = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_rpc_url(&self.rpc_url)?;

        let allocation = url::Url::parse(&self.allocation_url).map_err(|e| ConfigError::InvalidValue {
            field: "allocation_url".to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(allocation.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "allocation_url".to_string(),
                reason: format!("unsupported scheme '{}'", allocation.scheme()),
            });
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retained_path(&self) -> PathBuf {
        self.output_dir.join(RETAINED_FILE)
    }

    pub fn changed_path(&self) -> PathBuf {
        self.output_dir.join(CHANGED_FILE)
    }
}

/// Trimmed non-empty lines, skipping `#` comments.
pub fn parse_identifier_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Reads the accounts file. Unlike the proxy list, it must exist.
pub fn read_identifier_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.display().to_string(),
        msg: e.to_string(),
    })?;
    Ok(parse_identifier_lines(&content))
}
