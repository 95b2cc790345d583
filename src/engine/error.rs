//! Error types for ledger and redemption operations.

use thiserror::Error;

use crate::Points;
use crate::model::{CustomerId, GiftId, RowRef};
use crate::store::StoreError;

/// Error returned by every [`Engine`](super::Engine) operation.
///
/// Business-rule failures are detected before anything is written, so an
/// error always means the operation left no trace.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(RowRef),

    #[error("{0} already exists")]
    AlreadyExists(RowRef),

    #[error("invalid amount {0}: must be positive")]
    InvalidAmount(Points),

    #[error("insufficient points for customer {customer}: balance {balance}, required {required}")]
    InsufficientPoints {
        customer: CustomerId,
        balance: Points,
        required: Points,
    },

    #[error("gift {0} is out of stock")]
    OutOfStock(GiftId),

    #[error("gift {0} has redemptions and cannot be removed")]
    GiftInUse(GiftId),

    #[error("balance of customer {0} would overflow")]
    BalanceOverflow(CustomerId),

    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(StoreError),

    #[error("store failure: {0}")]
    Internal(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        if err.is_conflict() {
            LedgerError::ConcurrencyConflict(err)
        } else {
            LedgerError::Internal(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_failures_become_conflicts() {
        let err = LedgerError::from(StoreError::LockTimeout(RowRef::Gift(2)));
        assert!(matches!(err, LedgerError::ConcurrencyConflict(_)));

        let err = LedgerError::from(StoreError::AlreadyHeld(RowRef::Customer(1)));
        assert!(matches!(err, LedgerError::ConcurrencyConflict(_)));
    }

    #[test]
    fn other_store_failures_are_internal() {
        let err = LedgerError::from(StoreError::Commit("disk full".to_string()));
        assert!(matches!(err, LedgerError::Internal(_)));

        let err = LedgerError::from(StoreError::NotLocked(RowRef::Customer(1)));
        assert!(matches!(err, LedgerError::Internal(_)));
    }

    #[test]
    fn messages_name_the_reason() {
        let err = LedgerError::InsufficientPoints {
            customer: 4,
            balance: Points::new(40),
            required: Points::new(50),
        };
        assert_eq!(
            err.to_string(),
            "insufficient points for customer 4: balance 40, required 50"
        );
        assert_eq!(
            LedgerError::NotFound(RowRef::Gift(8)).to_string(),
            "gift 8 not found"
        );
        assert_eq!(
            LedgerError::GiftInUse(3).to_string(),
            "gift 3 has redemptions and cannot be removed"
        );
    }
}
