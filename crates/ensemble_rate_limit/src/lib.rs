//! Rate-limit aware retry and configuration.
//!
//! [`with_retry`] re-invokes an async operation while it keeps failing with a
//! rate-limit-class error, honouring the wait the provider suggests and
//! falling back to clamped exponential backoff otherwise. Every other error
//! propagates on first occurrence.
//!
//! [`EnsembleConfig`] collects the tunables of every ensemble crate and loads
//! them from bundled defaults, user files and the environment.

mod config;
mod retry;
mod signal;

pub use config::{EngineConfig, EnsembleConfig, RunConfig, StorageConfig};
pub use retry::{RetryPolicy, with_retry};
pub use signal::{RetrySignal, RetryableError, parse_retry_after};
