use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Display for ProxyConfig {
    // Credentials stay out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Parses a worker count typed by the user or passed on the command line.
///
/// Zero, negative and non-numeric input are rejected before any work starts.
pub fn parse_concurrency(input: &str) -> Result<NonZeroUsize, ConfigError> {
    let trimmed = input.trim();
    let value: i64 = trimmed.parse().map_err(|_| ConfigError::InvalidValue {
        field: "threads".to_string(),
        reason: format!("Wrong Threads Number: '{}'", trimmed),
    })?;

    usize::try_from(value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: "threads".to_string(),
            reason: format!("threads must be a positive integer, got {}", value),
        })
}

/// Checks that an RPC endpoint is an absolute http(s) URL.
pub fn validate_rpc_url(raw: &str) -> Result<url::Url, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingField {
            field: "rpc_url".to_string(),
        });
    }

    match url::Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(ConfigError::InvalidRpcUrl {
            url: trimmed.to_string(),
        }),
    }
}
