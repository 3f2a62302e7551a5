//! # Utilities Module
//!
//! Plumbing shared by every checker binary: logging, proxy rotation, the
//! retrying HTTP client, output sinks and the bounded worker runner.

pub mod http;
pub mod logger;
pub mod proxy_manager;
pub mod retry;
pub mod runner;
pub mod sink;

pub use http::{HttpReply, Method, ReqwestTransport, RequestSpec, Transport};
pub use logger::setup_logger;
pub use proxy_manager::{ProxyManager, ProxyRotator};
pub use retry::{RetryPolicy, RetryingClient};
pub use runner::WorkerRunner;
pub use sink::{FileSink, LineSink};
