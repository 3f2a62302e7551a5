use crate::config::ProxyConfig;
use crate::error::NetworkError;
use async_trait::async_trait;
use std::sync::OnceLock;
use std::time::Duration;

/// HTTP verbs used by the checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Everything needed to replay a request on any proxy.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// When set, a non-2xx status counts as a failed attempt.
    pub require_success: bool,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            require_success: false,
        }
    }

    pub fn post_json(url: impl Into<String>, body: &serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body.to_string().into_bytes()),
            require_success: false,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn require_success(mut self) -> Self {
        self.require_success = true;
        self
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One request attempt through an optional proxy.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: &RequestSpec,
        proxy: Option<&ProxyConfig>,
    ) -> Result<HttpReply, NetworkError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(
        &self,
        request: &RequestSpec,
        proxy: Option<&ProxyConfig>,
    ) -> Result<HttpReply, NetworkError> {
        (**self).execute(request, proxy).await
    }
}

/// `reqwest` transport building a fresh client per proxied attempt, so a
/// failing proxy never leaks its connection pool into the next attempt.
/// Direct connections share one lazily built client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    timeout: Duration,
    connect_timeout: Duration,
    direct: OnceLock<reqwest::Client>,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout: Duration::from_secs(10),
            direct: OnceLock::new(),
        }
    }

    fn client_for(&self, proxy: Option<&ProxyConfig>) -> Result<reqwest::Client, NetworkError> {
        if proxy.is_some() {
            return self.build_client(proxy);
        }
        if let Some(client) = self.direct.get() {
            return Ok(client.clone());
        }

        let client = self.build_client(None)?;
        // A concurrent caller may have won the race; either client works.
        Ok(self.direct.get_or_init(|| client).clone())
    }

    fn build_client(&self, proxy: Option<&ProxyConfig>) -> Result<reqwest::Client, NetworkError> {
        let mut client_builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .pool_idle_timeout(None);

        if let Some(proxy_config) = proxy {
            let proxy = reqwest::Proxy::all(&proxy_config.url).map_err(|e| {
                NetworkError::InvalidProxy {
                    proxy: proxy_config.url.clone(),
                    reason: e.to_string(),
                }
            })?;

            if let (Some(username), Some(password)) =
                (&proxy_config.username, &proxy_config.password)
            {
                client_builder = client_builder.proxy(proxy.basic_auth(username, password));
            } else {
                client_builder = client_builder.proxy(proxy);
            }
        }

        client_builder
            .build()
            .map_err(|e| NetworkError::InvalidProxy {
                proxy: proxy.map(|p| p.url.clone()).unwrap_or_else(|| "direct".to_string()),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: &RequestSpec,
        proxy: Option<&ProxyConfig>,
    ) -> Result<HttpReply, NetworkError> {
        let client = self.client_for(proxy)?;

        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let transport_err = |e: reqwest::Error| NetworkError::Transport {
            endpoint: request.url.clone(),
            reason: e.to_string(),
        };

        let response = builder.send().await.map_err(transport_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_err)?;

        Ok(HttpReply { status, body })
    }
}
