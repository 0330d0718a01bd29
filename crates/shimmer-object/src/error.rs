//! Error types for the dynamic object model.
//!
//! `ObjectError::Thrown` carries an arbitrary value raised by wrapped code.
//! Instrumentation layers must re-surface it unchanged so callers observe
//! the same failure they would see on an uninstrumented object.

use thiserror::Error;

use crate::value::Value;

/// Errors produced when interacting with a dynamic object.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObjectError {
    /// A value thrown by user-provided code (a constructor, method,
    /// accessor, mutator, or listener).
    #[error("thrown: {0}")]
    Thrown(Value),

    /// The named member does not exist on the object or its class behavior.
    #[error("no such member: '{0}'")]
    NoSuchMember(String),

    /// The member's current value is not callable.
    #[error("member '{0}' is not callable")]
    NotCallable(String),

    /// The member has a mutator but no accessor.
    #[error("member '{0}' has no accessor")]
    NoGetter(String),

    /// The member is read-only or has no mutator.
    #[error("member '{0}' is not writable")]
    NotWritable(String),

    /// A method was invoked without a receiver to act on.
    #[error("method '{0}' invoked without a receiver")]
    MissingReceiver(String),
}

impl ObjectError {
    /// Throw an arbitrary value, the way dynamic code raises failures.
    pub fn thrown(value: impl Into<Value>) -> Self {
        Self::Thrown(value.into())
    }

    /// The thrown payload, or a string rendering for structural errors.
    ///
    /// Event-style failure records carry the error as a payload value.
    pub fn payload(&self) -> Value {
        match self {
            Self::Thrown(value) => value.clone(),
            other => Value::Str(other.to_string()),
        }
    }
}

/// Result type alias for object-model operations.
pub type ObjectResult<T> = std::result::Result<T, ObjectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thrown_payload_preserved() {
        let err = ObjectError::thrown("boom");
        assert_eq!(err.payload(), Value::Str("boom".to_string()));
    }

    #[test]
    fn test_structural_error_payload_is_message() {
        let err = ObjectError::NoSuchMember("volume".to_string());
        match err.payload() {
            Value::Str(s) => assert!(s.contains("volume")),
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
