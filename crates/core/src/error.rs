//! Error types for the codec engine
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! All errors are synchronous results of an encode/decode/resolve call.
//! The engine performs no local recovery: no retries, no default-value
//! substitution. Recovery, if any, belongs to the calling layer.

use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the codec engine
#[derive(Debug, Error)]
pub enum Error {
    /// No conversion strategy exists for the named type.
    ///
    /// Raised at first resolution and raised identically on every later
    /// attempt for the same type. Never retried, never silently defaulted.
    #[error("no value conversion for type {0}")]
    UnsupportedType(String),

    /// A case read that does not match the active value case
    /// (e.g. reading an integer out of a string value)
    #[error("expected a {expected} value, found {actual}")]
    TypeMismatch {
        /// The case the caller asked for
        expected: &'static str,
        /// The case that was actually active
        actual: &'static str,
    },

    /// A decode-time shape violation (wrong pair arity, malformed blob
    /// width, unknown enum discriminant, unparsable text form)
    #[error("malformed {target}: {reason}")]
    Structure {
        /// What was being decoded
        target: &'static str,
        /// Expected vs. actual shape
        reason: String,
    },

    /// A dynamic registration supplied only one of the two conversion
    /// directions. Fatal at registration time.
    #[error("type {0} supplies only one conversion direction but needs both")]
    PartialCodec(String),

    /// The field-naming query was asked about a property the entity
    /// model does not declare
    #[error("type {type_name} has no property named {property:?}")]
    UnknownProperty {
        /// The entity type that was queried
        type_name: &'static str,
        /// The unknown property name
        property: String,
    },
}

impl Error {
    /// Unsupported-type error naming `T`
    pub fn unsupported<T: ?Sized>() -> Self {
        Error::UnsupportedType(std::any::type_name::<T>().to_string())
    }

    /// Case-mismatch error from the expected and actual case names
    pub fn mismatch(expected: &'static str, actual: &'static str) -> Self {
        Error::TypeMismatch { expected, actual }
    }

    /// Shape-violation error for `target`
    pub fn structure(target: &'static str, reason: impl Into<String>) -> Self {
        Error::Structure {
            target,
            reason: reason.into(),
        }
    }
}
