//! Errors raised while running member code or compiled accessors

/// Failure raised at call time by member thunks, casts and indexing.
///
/// Compiled accessors propagate this unchanged; the caller sees the member's
/// own failure rather than a wrapper.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvokeError {
    /// A value could not be converted to the required type
    #[error("Invalid cast: expected {expected}, found {found}")]
    InvalidCast { expected: String, found: String },

    /// A null value was used where an instance is required
    #[error("Null reference: {0}")]
    NullReference(String),

    /// Array or indexer access outside the valid range
    #[error("Index {index} is out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The argument array does not match the member's parameter list
    #[error("Expected {expected} arguments, received {received}")]
    ArgumentCount { expected: usize, received: usize },

    /// The instance is not of the member's declaring type
    #[error("Target mismatch: {0}")]
    TargetMismatch(String),

    /// An argument was well-typed but rejected by the operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The calling thread already holds the instance's lock in a conflicting mode
    #[error("Re-entrant access: {0}")]
    Reentrant(String),

    /// Another thread held the instance's lock past the configured wait limit
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    /// Failure raised by member code itself
    #[error("{0}")]
    Thrown(String),
}

impl InvokeError {
    /// Shorthand for a failure raised by user member code.
    pub fn thrown(message: impl Into<String>) -> Self {
        Self::Thrown(message.into())
    }

    pub(crate) fn target_mismatch<T: ?Sized>() -> Self {
        Self::TargetMismatch(format!(
            "expected an instance of {}",
            std::any::type_name::<T>()
        ))
    }
}

/// Result type for call-time operations
pub type InvokeResult<T> = Result<T, InvokeError>;
