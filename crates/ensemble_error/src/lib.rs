//! Error types for ensemble.
//!
//! This crate provides the foundation error types used throughout the ensemble workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use ensemble_error::{EnsembleResult, StoreError, StoreErrorKind};
//!
//! fn open_run() -> EnsembleResult<String> {
//!     Err(StoreError::new(StoreErrorKind::NotFound("20250101_abcd1234_demo".into())))?
//! }
//!
//! assert!(open_run().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod run;
mod store;

pub use config::ConfigError;
pub use error::{EnsembleError, EnsembleErrorKind, EnsembleResult};
pub use run::{RunError, RunErrorKind};
pub use store::{StoreError, StoreErrorKind};
