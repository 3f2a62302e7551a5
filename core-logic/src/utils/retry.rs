use crate::error::NetworkError;
use crate::utils::http::{HttpReply, RequestSpec, Transport};
use crate::utils::proxy_manager::ProxyRotator;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Pause between failed attempts. There is no attempt limit.
///
/// The default retries immediately with a fresh proxy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 0,
            max_delay_ms: 0,
            exponential_base: 2.0,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(base_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms: base_delay_ms.saturating_mul(30),
            ..Default::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if self.base_delay_ms == 0 {
            return Duration::ZERO;
        }

        let delay_ms = self.base_delay_ms as f64 * self.exponential_base.powi(attempt.min(30) as i32);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64);

        let delay_ms = if self.jitter {
            let rng_factor = rand::thread_rng().gen_range(0.5..=1.5);
            delay_ms * rng_factor
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Wraps a [`Transport`] in an unbounded retry loop.
///
/// Each attempt takes the next proxy from the rotator. Transport failures,
/// disallowed status codes and replies rejected by the caller's validator are
/// logged and retried; only a validated value ever leaves [`fetch`].
///
/// [`fetch`]: RetryingClient::fetch
pub struct RetryingClient<T> {
    transport: T,
    rotator: Arc<ProxyRotator>,
    policy: RetryPolicy,
    failed_attempts: AtomicU64,
}

impl<T: Transport> RetryingClient<T> {
    pub fn new(transport: T, rotator: Arc<ProxyRotator>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            rotator,
            policy,
            failed_attempts: AtomicU64::new(0),
        }
    }

    /// Total failed attempts across all calls, for the run summary.
    pub fn failed_attempts(&self) -> u64 {
        self.failed_attempts.load(Ordering::Relaxed)
    }

    /// Runs `request` until `validate` accepts a reply.
    ///
    /// `log_prefix` and `operation` only shape the retry notices, e.g.
    /// `"<address> | Error When Parsing Allocation: Wrong response: ..."`.
    pub async fn fetch<R, F>(
        &self,
        request: &RequestSpec,
        log_prefix: &str,
        operation: &str,
        mut validate: F,
    ) -> R
    where
        F: FnMut(&HttpReply) -> Result<R, NetworkError>,
    {
        let mut attempt: u32 = 0;

        loop {
            let proxy = self.rotator.next();

            let outcome = match self.transport.execute(request, proxy).await {
                Ok(reply) if request.require_success && !reply.is_success() => {
                    Err(NetworkError::HttpError {
                        status_code: reply.status,
                        endpoint: request.url.clone(),
                    })
                }
                Ok(reply) => validate(&reply),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("{} | {} succeeded on attempt {}", log_prefix, operation, attempt + 1);
                    }
                    return value;
                }
                Err(e) => {
                    self.failed_attempts.fetch_add(1, Ordering::Relaxed);
                    warn!("{} | Error When {}: {}", log_prefix, operation, e);

                    let delay = self.policy.calculate_delay(attempt);
                    attempt = attempt.saturating_add(1);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    } else {
                        // Zero delay still yields to the scheduler.
                        tokio::task::yield_now().await;
                    }
                }
            }
        }
    }
}
