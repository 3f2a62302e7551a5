use crate::config::ProxyConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

pub struct ProxyManager;

impl ProxyManager {
    /// Loads proxies from a text file, one per line.
    ///
    /// Accepted formats:
    /// - `ip:port`
    /// - `ip:port:username:password`
    /// - `http://username:password@ip:port`
    ///
    /// A missing file is not an error: the checker then runs without proxies.
    pub fn load_proxies(path: impl AsRef<Path>) -> Result<Vec<ProxyConfig>> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "{} not found. Running without proxies.",
                path.display()
            );
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let proxies = Self::parse_proxies(&content);

        info!("Loaded {} proxies from {}", proxies.len(), path.display());
        Ok(proxies)
    }

    pub fn parse_proxies(content: &str) -> Vec<ProxyConfig> {
        let mut proxies = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match Self::parse_line(line) {
                Some(proxy) => proxies.push(proxy),
                None => warn!("Skipping invalid proxy line: {}", line),
            }
        }

        proxies
    }

    fn parse_line(line: &str) -> Option<ProxyConfig> {
        if line.starts_with("http") && line.contains("://") {
            let u = url::Url::parse(line).ok()?;
            let host = u.host_str()?;
            let port = u
                .port()
                .unwrap_or(if u.scheme() == "https" { 443 } else { 80 });
            let username = Some(u.username().to_string()).filter(|s| !s.is_empty());
            let password = u.password().map(str::to_string);

            return Some(ProxyConfig {
                url: format!("{}://{}:{}", u.scheme(), host, port),
                username,
                password,
            });
        }

        let parts: Vec<&str> = line.split(':').map(|s| s.trim()).collect();
        match parts.len() {
            2 => Some(ProxyConfig {
                url: format!("http://{}:{}", parts[0], parts[1]),
                username: None,
                password: None,
            }),
            4 => Some(ProxyConfig {
                url: format!("http://{}:{}", parts[0], parts[1]),
                username: Some(parts[2].to_string()),
                password: Some(parts[3].to_string()),
            }),
            _ => None,
        }
    }
}

/// Round-robin proxy selection shared by every in-flight check.
///
/// The pool is fixed at construction; the cursor is the only mutable state.
/// An empty pool always yields `None`, meaning a direct connection.
#[derive(Debug, Default)]
pub struct ProxyRotator {
    proxies: Vec<ProxyConfig>,
    cursor: AtomicUsize,
}

impl ProxyRotator {
    pub fn new(proxies: Vec<ProxyConfig>) -> Self {
        Self {
            proxies,
            cursor: AtomicUsize::new(0),
        }
    }

    /// A rotator that never hands out a proxy.
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Option<&ProxyConfig> {
        if self.proxies.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        self.proxies.get(idx)
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}
