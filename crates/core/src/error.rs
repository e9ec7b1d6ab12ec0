//! Resolution and compilation errors

use crate::config::ConfigError;
use crate::flags::Flags;
use crate::meta::InvokeError;

/// Failure to resolve or compile an accessor.
///
/// Raised on the requesting thread before anything is published; accessors
/// that were published never raise it.
#[derive(Debug, thiserror::Error)]
pub enum ReflectError {
    /// No field or property matched
    #[error("Member not found: {type_name}.{name} ({flags})")]
    MemberNotFound {
        type_name: String,
        name: String,
        flags: Flags,
    },

    /// No method matched name, binding and parameter list
    #[error("Method not found: {type_name}.{name}({params}) ({flags})")]
    MethodNotFound {
        type_name: String,
        name: String,
        params: String,
        flags: Flags,
    },

    /// No constructor matched the parameter list
    #[error("Constructor not found: {type_name}({params})")]
    ConstructorNotFound { type_name: String, params: String },

    /// The request does not describe a valid operation or matches several members
    #[error("Ambiguous operation: {0}")]
    AmbiguousOperation(String),

    /// An accessor method has the wrong parameter shape
    #[error("Invalid argument shape for {member}: {reason}")]
    InvalidArgumentShape { member: String, reason: String },

    /// A mapper target member pairs with more than one source member
    #[error("Ambiguous mapping for {target}: candidates {candidates:?}")]
    AmbiguousMapping {
        target: String,
        candidates: Vec<String>,
    },

    /// A value has no runtime type to resolve against
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Raised by member code through the convenience API
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for resolution and compilation
pub type ReflectResult<T> = Result<T, ReflectError>;
