//! Error types for the interception engine.

use thiserror::Error;

/// Errors surfaced by engine operations that target a specific member.
///
/// Failures inside intercepted calls are not engine errors; they travel
/// through [`shimmer_object::ObjectError`] exactly as the uninstrumented
/// call would have raised them.
#[derive(Debug, Clone, Error)]
pub enum ShimError {
    /// The named member does not exist on the target.
    #[error("class '{class}' has no member '{member}'")]
    NoSuchMember { class: String, member: String },

    /// The member exists but cannot be wrapped.
    #[error("member '{member}' cannot be instrumented: {reason}")]
    NotInstrumentable { member: String, reason: String },
}

/// Convenience result type for engine operations.
pub type ShimResult<T> = Result<T, ShimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShimError::NoSuchMember {
            class: "Player".to_string(),
            member: "mute".to_string(),
        };
        assert_eq!(err.to_string(), "class 'Player' has no member 'mute'");

        let err = ShimError::NotInstrumentable {
            member: "volume".to_string(),
            reason: "not callable".to_string(),
        };
        assert!(err.to_string().contains("volume"));
    }
}
