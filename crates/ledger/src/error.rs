//! The module contains the errors the ledger can throw.
//!
//! Validation errors ([`InvalidAmount`], [`InsufficientBalance`],
//! [`AccountNotFound`]) require different input and must not be retried.
//! [`CorruptRow`] means a stored row no longer decodes; retrying cannot
//! help either. [`LockTimeout`] and [`Database`] are transient: nothing
//! was committed, so the caller may retry the whole operation.
//!
//!  [`InvalidAmount`]: LedgerError::InvalidAmount
//!  [`InsufficientBalance`]: LedgerError::InsufficientBalance
//!  [`AccountNotFound`]: LedgerError::AccountNotFound
//!  [`CorruptRow`]: LedgerError::CorruptRow
//!  [`LockTimeout`]: LedgerError::LockTimeout
//!  [`Database`]: LedgerError::Database
use sea_orm::DbErr;
use thiserror::Error;

use crate::Money;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Insufficient balance: current {current}, requested {requested}")]
    InsufficientBalance { current: Money, requested: Money },
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Corrupt ledger row: {0}")]
    CorruptRow(String),
    #[error("Lock wait exceeded: {0}")]
    LockTimeout(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl LedgerError {
    /// Returns `true` when the caller may retry the operation unchanged.
    ///
    /// Failed operations never leave partial state behind, so retrying a
    /// transient error is always safe.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout(_) | Self::Database(_))
    }

    /// Missing amount for an [`InsufficientBalance`] rejection.
    ///
    /// [`InsufficientBalance`]: LedgerError::InsufficientBalance
    #[must_use]
    pub fn shortfall(&self) -> Option<Money> {
        match self {
            Self::InsufficientBalance { current, requested } => Some(*requested - *current),
            _ => None,
        }
    }
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (
                Self::InsufficientBalance {
                    current: ca,
                    requested: ra,
                },
                Self::InsufficientBalance {
                    current: cb,
                    requested: rb,
                },
            ) => ca == cb && ra == rb,
            (Self::AccountNotFound(a), Self::AccountNotFound(b)) => a == b,
            (Self::CorruptRow(a), Self::CorruptRow(b)) => a == b,
            (Self::LockTimeout(a), Self::LockTimeout(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortfall_is_requested_minus_current() {
        let err = LedgerError::InsufficientBalance {
            current: Money::from_minor(1500),
            requested: Money::from_minor(2000),
        };
        assert_eq!(err.shortfall(), Some(Money::from_minor(500)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(LedgerError::LockTimeout("fund 1".to_string()).is_retryable());
        assert!(!LedgerError::AccountNotFound("m1".to_string()).is_retryable());
    }
}
