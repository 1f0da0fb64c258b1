//! Top-level error wrapper types.

use crate::{ConfigError, RunError, StoreError};

/// Every error condition an ensemble crate can raise.
///
/// # Examples
///
/// ```
/// use ensemble_error::{EnsembleError, ConfigError};
///
/// let err: EnsembleError = ConfigError::new("bad logs_dir").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum EnsembleErrorKind {
    /// Transcript store error
    #[from(StoreError)]
    Store(StoreError),
    /// Run lifecycle error
    #[from(RunError)]
    Run(RunError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Ensemble error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Ensemble Error: {}", _0)]
pub struct EnsembleError(Box<EnsembleErrorKind>);

impl EnsembleError {
    /// Create a new error from a kind.
    pub fn new(kind: EnsembleErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &EnsembleErrorKind {
        &self.0
    }

    /// The run error kind, if this is a run error.
    pub fn run_kind(&self) -> Option<&crate::RunErrorKind> {
        match self.kind() {
            EnsembleErrorKind::Run(err) => Some(&err.kind),
            _ => None,
        }
    }

    /// The store error kind, if this is a store error.
    pub fn store_kind(&self) -> Option<&crate::StoreErrorKind> {
        match self.kind() {
            EnsembleErrorKind::Store(err) => Some(&err.kind),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to EnsembleErrorKind
impl<T> From<T> for EnsembleError
where
    T: Into<EnsembleErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for ensemble operations.
pub type EnsembleResult<T> = std::result::Result<T, EnsembleError>;
