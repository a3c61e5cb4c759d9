use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a coordinator operation.
///
/// Serializable so it can be returned to workers over RPC.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinatorError {
    /// The phase and task statuses no longer describe a reachable state.
    #[error("coordinator invariant violated: {0}")]
    InvariantViolation(String),
}

impl<T> From<std::sync::PoisonError<T>> for CoordinatorError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        CoordinatorError::InvariantViolation(
            "task state lock poisoned by a panicking holder".to_owned(),
        )
    }
}
