//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// The kind of entity a lookup failed to resolve.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Account,
    Wallet,
    Transaction,
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            EntityKind::Account => "account",
            EntityKind::Wallet => "wallet",
            EntityKind::Transaction => "transaction",
        };
        f.write_str(name)
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (validation,
/// invariants, lookups). Storage concerns belong to the engine crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A transaction amount was zero or negative.
    #[error("amount must be positive (got {amount})")]
    InvalidAmount { amount: i64 },

    /// A withdrawal or transfer exceeded the source wallet's balance.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },

    /// A transfer named the same wallet as both source and destination.
    #[error("transfer source and destination are the same wallet")]
    SameWallet,

    /// A referenced account/wallet/transaction id is unknown.
    #[error("{0} not found")]
    NotFound(EntityKind),

    /// A value failed validation (e.g. an empty name).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl LedgerError {
    pub fn invalid_amount(amount: i64) -> Self {
        Self::InvalidAmount { amount }
    }

    pub fn insufficient_funds(requested: i64, available: i64) -> Self {
        Self::InsufficientFunds {
            requested,
            available,
        }
    }

    pub fn not_found(kind: EntityKind) -> Self {
        Self::NotFound(kind)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_human_readable_messages() {
        assert_eq!(
            LedgerError::invalid_amount(0).to_string(),
            "amount must be positive (got 0)"
        );
        assert_eq!(
            LedgerError::insufficient_funds(700, 400).to_string(),
            "insufficient funds: requested 700, available 400"
        );
        assert_eq!(
            LedgerError::not_found(EntityKind::Wallet).to_string(),
            "wallet not found"
        );
    }
}
