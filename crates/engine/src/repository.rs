use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pocketmoney_core::{AccountId, WalletId};
use pocketmoney_ledger::{Account, Transaction, Wallet};

/// Storage-layer failure, opaque to the engine.
///
/// The engine surfaces these unchanged and never retries: retry safety
/// depends on whether the underlying write was partially applied, and that
/// knowledge belongs to the repository, which must guarantee its own
/// atomicity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// The backing store could not complete the operation.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The store rejected the batch (duplicate ids, missing parent rows).
    #[error("storage rejected write: {0}")]
    Rejected(String),
}

/// The full persisted entity set, handed to the engine at startup.
///
/// Relationships travel as back-references (`Wallet::account_id`,
/// `Transaction::wallet_id`); the engine rebuilds the forward id lists while
/// hydrating. No ordering is guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityGraph {
    pub accounts: Vec<Account>,
    pub wallets: Vec<Wallet>,
    pub transactions: Vec<Transaction>,
}

/// Durable storage and cascade-delete mechanics.
///
/// Write methods are atomic per call: every record in the call persists, or
/// none do. Implementations own referential integrity (a transaction's wallet
/// must exist, ids must be fresh) and report violations as
/// [`PersistError::Rejected`] without applying any part of the batch.
pub trait Repository: Send + Sync {
    /// Load the full entity graph.
    fn load(&self) -> Result<EntityGraph, PersistError>;

    /// Store a batch of transaction records as one unit.
    ///
    /// The two-record transfer write goes through here; a partial append must
    /// never be observable.
    fn persist_transactions(&self, batch: &[Transaction]) -> Result<(), PersistError>;

    /// Store a new account together with its provisioned wallets, as one unit.
    fn persist_account(&self, account: &Account, wallets: &[Wallet]) -> Result<(), PersistError>;

    /// Store a wallet added to an existing account.
    fn persist_wallet(&self, wallet: &Wallet) -> Result<(), PersistError>;

    /// Delete an account and every wallet and transaction under it.
    fn cascade_delete_account(&self, account_id: AccountId) -> Result<(), PersistError>;

    /// Delete a wallet and every transaction under it.
    fn cascade_delete_wallet(&self, wallet_id: WalletId) -> Result<(), PersistError>;
}

impl<R> Repository for Arc<R>
where
    R: Repository + ?Sized,
{
    fn load(&self) -> Result<EntityGraph, PersistError> {
        (**self).load()
    }

    fn persist_transactions(&self, batch: &[Transaction]) -> Result<(), PersistError> {
        (**self).persist_transactions(batch)
    }

    fn persist_account(&self, account: &Account, wallets: &[Wallet]) -> Result<(), PersistError> {
        (**self).persist_account(account, wallets)
    }

    fn persist_wallet(&self, wallet: &Wallet) -> Result<(), PersistError> {
        (**self).persist_wallet(wallet)
    }

    fn cascade_delete_account(&self, account_id: AccountId) -> Result<(), PersistError> {
        (**self).cascade_delete_account(account_id)
    }

    fn cascade_delete_wallet(&self, wallet_id: WalletId) -> Result<(), PersistError> {
        (**self).cascade_delete_wallet(wallet_id)
    }
}
