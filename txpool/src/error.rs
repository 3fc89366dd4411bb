//! Scheduling error types.

use thiserror::Error;

use crate::transaction::Weight;

/// Errors surfaced when queueing a transaction for scheduling.
///
/// All other pool operations are infallible; internal invariant violations
/// abort the process instead of surfacing here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleTxError {
    /// The pool is at capacity and the transaction's priority does not beat
    /// the current minimum. Transient; the caller may retry later.
    #[error("transaction pool is full")]
    PoolFull,

    /// A weight exceeds its configured limit, so the transaction can never
    /// be scheduled under the current parameters. Permanent; the caller
    /// must not retry and may penalize the submitting peer.
    #[error("transaction weight {weight} exceeds the {dimension} limit of {limit}")]
    Oversize {
        /// Dimension whose limit was exceeded.
        dimension: Weight,
        /// The transaction's weight in that dimension.
        weight: u64,
        /// The configured limit for that dimension.
        limit: u64,
    },

    /// The transaction is already in the pool. Benign; the caller may
    /// silently ignore it.
    #[error("transaction already exists in the pool")]
    Duplicate,
}

impl ScheduleTxError {
    /// Returns true if retrying the same transaction can never succeed
    /// under the current scheduling parameters.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ScheduleTxError::Oversize { .. })
    }
}

/// Result type alias for scheduling operations.
pub type Result<T> = std::result::Result<T, ScheduleTxError>;
