//! Transcript store error types.

/// Kinds of transcript store errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StoreErrorKind {
    /// Failed to create a run or root directory
    #[display("Failed to create directory: {}", _0)]
    DirectoryCreation(String),
    /// Run location already exists and holds data
    #[display("Run already exists: {}", _0)]
    AlreadyExists(String),
    /// Failed to write a record or metadata file
    #[display("Failed to write file: {}", _0)]
    FileWrite(String),
    /// Failed to read a record or metadata file
    #[display("Failed to read file: {}", _0)]
    FileRead(String),
    /// Run not found in the store
    #[display("Run not found: {}", _0)]
    NotFound(String),
    /// Run identifier is not a safe directory name
    #[display("Invalid run id: {}", _0)]
    InvalidRunId(String),
    /// Event or metadata could not be serialized
    #[display("Serialization failed: {}", _0)]
    Serialization(String),
}

/// Transcript store error with location tracking.
///
/// # Examples
///
/// ```
/// use ensemble_error::{StoreError, StoreErrorKind};
///
/// let err = StoreError::new(StoreErrorKind::NotFound("20250101_abcd1234_x".to_string()));
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Store Error: {} at line {} in {}", kind, line, file)]
pub struct StoreError {
    /// The kind of error that occurred
    pub kind: StoreErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StoreError {
    /// Create a new store error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StoreErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
