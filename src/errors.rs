/*!
 * Error Types
 * Synchronization errors with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for blocking synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Synchronization errors with serialization support
///
/// `IllegalState` is always a caller contract violation. `Interrupted` and
/// `Timeout` are expected outcomes of cancellable or bounded waits.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SyncError {
    #[error("Illegal lock state: {0}")]
    #[diagnostic(
        code(sync::illegal_state),
        help("The calling thread must hold the lock for this operation. Check unlock/await pairing.")
    )]
    IllegalState(String),

    #[error("Wait was interrupted")]
    #[diagnostic(
        code(sync::interrupted),
        help("The cancellation token passed to the blocking call was cancelled.")
    )]
    Interrupted,

    #[error("Wait operation timed out")]
    #[diagnostic(
        code(sync::timeout),
        help("The resource did not become available before the deadline.")
    )]
    Timeout,
}

impl SyncError {
    pub(crate) fn illegal_state(reason: impl Into<String>) -> Self {
        SyncError::IllegalState(reason.into())
    }

    /// True for contract violations that indicate a caller bug
    #[inline]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, SyncError::IllegalState(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let err = SyncError::illegal_state("unlock of a free lock");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            r#"{"error_type":"illegal_state","details":"unlock of a free lock"}"#
        );

        let back: SyncError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_contract_violation() {
        assert!(SyncError::illegal_state("x").is_contract_violation());
        assert!(!SyncError::Interrupted.is_contract_violation());
        assert!(!SyncError::Timeout.is_contract_violation());
    }
}
