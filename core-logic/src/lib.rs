//! # Core Logic - Shared Utilities for Account Checkers
//!
//! This crate provides the chain-agnostic plumbing used by checker binaries.
//!
//! ## Modules
//!
//! - [`config`] - Proxy configuration and startup validation
//! - [`error`] - Typed error handling with thiserror
//! - [`traits`] - The [`Task`] abstraction run by the worker pool
//! - [`utils`] - Logger, proxy rotation, retrying HTTP client, sinks, runner

pub mod config;
pub mod error;
pub mod traits;
pub mod utils;

pub use config::{parse_concurrency, validate_rpc_url, ProxyConfig};
pub use error::{ConfigError, NetworkError, SinkError};
pub use traits::{RunStats, Task};

pub use utils::{
    setup_logger, FileSink, HttpReply, LineSink, Method, ProxyManager, ProxyRotator,
    ReqwestTransport, RequestSpec, RetryPolicy, RetryingClient, Transport, WorkerRunner,
};
