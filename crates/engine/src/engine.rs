//! The single writer for all ledger mutation.
//!
//! Every operation follows the same pipeline: resolve ids, take the owning
//! account's exclusive lock, validate against the committed state, persist
//! the new records as one atomic unit, then apply them to the in-memory
//! state. Reads skip the account lock and work off the latest committed
//! snapshot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use pocketmoney_core::{AccountId, LedgerError, TransactionId, TransferPairId, WalletId};
use pocketmoney_ledger::{
    Account, AccountHierarchy, BalanceCalculator, Ledger, Transaction, Wallet,
};

use crate::repository::{EntityGraph, PersistError, Repository};
use crate::selection::SelectionStore;

/// Engine operation error: a domain failure, a storage failure surfaced
/// unchanged, or a poisoned engine lock.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    /// A thread panicked while holding an engine lock; the in-memory state
    /// can no longer be trusted.
    #[error("engine state lock poisoned")]
    Poisoned,
}

/// The committed in-memory view: entity arena plus the flat record store.
#[derive(Debug, Default)]
struct LedgerState {
    hierarchy: AccountHierarchy,
    ledger: Ledger,
}

impl LedgerState {
    /// Rebuild the working state from a persisted graph.
    ///
    /// The graph carries relationships as back-references only, in no
    /// particular order; accounts and wallets are replayed by creation time
    /// and records by timestamp (ties broken by the time-ordered id) so the
    /// forward id lists come back in insertion order.
    fn from_graph(graph: EntityGraph) -> Result<Self, EngineError> {
        let EntityGraph {
            mut accounts,
            mut wallets,
            mut transactions,
        } = graph;
        accounts.sort_by_key(|a| (a.created_at(), a.id()));
        wallets.sort_by_key(|w| (w.created_at(), w.id()));
        transactions.sort_by_key(|t| (t.timestamp(), t.id()));

        let mut state = Self::default();
        for account in accounts {
            state.hierarchy.insert_account(account);
        }
        for wallet in wallets {
            state.hierarchy.insert_wallet(wallet)?;
        }
        for tx in transactions {
            state.hierarchy.record_transaction(tx.wallet_id(), tx.id())?;
            state.ledger.insert(tx);
        }
        Ok(state)
    }

    fn balances(&self) -> BalanceCalculator<'_> {
        BalanceCalculator::new(&self.hierarchy, &self.ledger)
    }
}

/// Single entry point for all ledger mutation.
///
/// Generic over the repository and selection store so tests can inject
/// in-memory implementations and a real deployment can swap in durable ones
/// without touching domain code.
///
/// ## Concurrency discipline
///
/// Mutations on any wallet of account A hold an exclusive `Mutex` scoped to A
/// from validation through commit. That closes the check-then-act race (two
/// overlapping withdrawals both passing a funds check against a stale
/// balance) and serializes transfers, which touch two wallets of the same
/// account. Reads only take the state `RwLock` read guard; they may observe a
/// balance that is stale by one in-flight operation.
#[derive(Debug)]
pub struct LedgerEngine<R, S> {
    repository: R,
    selection: S,
    state: RwLock<LedgerState>,
    account_locks: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

impl<R, S> LedgerEngine<R, S>
where
    R: Repository,
    S: SelectionStore,
{
    /// Hydrate the engine from the repository's persisted graph.
    pub fn open(repository: R, selection: S) -> Result<Self, EngineError> {
        let graph = repository.load()?;
        let state = LedgerState::from_graph(graph)?;
        Ok(Self {
            repository,
            selection,
            state: RwLock::new(state),
            account_locks: Mutex::new(HashMap::new()),
        })
    }

    // ---- hierarchy mutation ----

    /// Create an account with its provisioned wallet pair (one atomic write)
    /// and make it the active selection.
    pub fn create_account(&self, name: &str, icon: &str) -> Result<AccountId, EngineError> {
        let now = Utc::now();
        let account = Account::new(name, icon, now)?;
        let parent = Wallet::parent_of(&account, now);
        let purse = Wallet::purse_of(&account, now);

        self.repository
            .persist_account(&account, &[parent.clone(), purse.clone()])?;

        let account_id = account.id();
        let parent_id = parent.id();
        {
            let mut state = self.write_state()?;
            state.hierarchy.insert_account(account);
            state.hierarchy.insert_wallet(parent)?;
            state.hierarchy.insert_wallet(purse)?;
        }
        self.selection.set_selected_account(Some(account_id));
        self.selection.set_selected_wallet(Some(parent_id));
        info!(account = %account_id, "account created");
        Ok(account_id)
    }

    /// Append a non-default wallet to an existing account.
    pub fn add_wallet(
        &self,
        account_id: AccountId,
        name: &str,
        icon: &str,
    ) -> Result<WalletId, EngineError> {
        let lock = self.account_lock(account_id)?;
        let _guard = lock.lock().map_err(|_| EngineError::Poisoned)?;

        let wallet = Wallet::new(account_id, name, icon, Utc::now())?;
        self.repository.persist_wallet(&wallet)?;

        let wallet_id = wallet.id();
        self.write_state()?.hierarchy.insert_wallet(wallet)?;
        info!(account = %account_id, wallet = %wallet_id, "wallet added");
        Ok(wallet_id)
    }

    /// Delete an account and everything under it, reassigning the selection
    /// if it pointed at the deleted subtree.
    pub fn delete_account(&self, account_id: AccountId) -> Result<(), EngineError> {
        let lock = self.account_lock(account_id)?;
        let _guard = lock.lock().map_err(|_| EngineError::Poisoned)?;

        self.repository.cascade_delete_account(account_id)?;

        let mut state = self.write_state()?;
        let (_, wallets) = state.hierarchy.remove_account(account_id)?;
        for wallet in &wallets {
            for tx_id in wallet.transaction_ids() {
                state.ledger.remove(*tx_id);
            }
        }
        if self.selection.selected_account() == Some(account_id) {
            let next_account = state.hierarchy.accounts().next().map(Account::id);
            let next_wallet = next_account.and_then(|id| {
                state
                    .hierarchy
                    .wallets_of(id)
                    .ok()
                    .and_then(|ws| ws.first().map(|w| w.id()))
            });
            self.selection.set_selected_account(next_account);
            self.selection.set_selected_wallet(next_wallet);
        }
        drop(state);

        // The id can never come back; its lock entry is dead weight.
        if let Ok(mut locks) = self.account_locks.lock() {
            locks.remove(&account_id);
        }
        info!(account = %account_id, "account deleted");
        Ok(())
    }

    /// Delete a wallet and its records, reassigning the wallet selection
    /// within the account if it pointed at the deleted wallet.
    pub fn delete_wallet(&self, wallet_id: WalletId) -> Result<(), EngineError> {
        let account_id = self.account_of(wallet_id)?;
        let lock = self.account_lock(account_id)?;
        let _guard = lock.lock().map_err(|_| EngineError::Poisoned)?;

        self.repository.cascade_delete_wallet(wallet_id)?;

        let mut state = self.write_state()?;
        let wallet = state.hierarchy.remove_wallet(wallet_id)?;
        for tx_id in wallet.transaction_ids() {
            state.ledger.remove(*tx_id);
        }
        if self.selection.selected_wallet() == Some(wallet_id) {
            let next = state
                .hierarchy
                .wallets_of(account_id)
                .ok()
                .and_then(|ws| ws.first().map(|w| w.id()));
            self.selection.set_selected_wallet(next);
        }
        drop(state);
        info!(wallet = %wallet_id, "wallet deleted");
        Ok(())
    }

    // ---- ledger mutation ----

    /// Record money entering the system.
    pub fn deposit(
        &self,
        wallet_id: WalletId,
        amount: i64,
        memo: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<TransactionId, EngineError> {
        let account_id = self.account_of(wallet_id)?;
        let lock = self.account_lock(account_id)?;
        let _guard = lock.lock().map_err(|_| EngineError::Poisoned)?;

        // Revalidate under the lock: the wallet may have been deleted while
        // we waited.
        self.read_state()?.hierarchy.wallet(wallet_id)?;
        let tx = Transaction::deposit(wallet_id, amount, memo, timestamp)?;

        self.repository
            .persist_transactions(std::slice::from_ref(&tx))?;

        let tx_id = tx.id();
        let mut state = self.write_state()?;
        state.hierarchy.record_transaction(wallet_id, tx_id)?;
        state.ledger.insert(tx);
        drop(state);
        info!(wallet = %wallet_id, amount, "deposit recorded");
        Ok(tx_id)
    }

    /// Record money leaving the system. The funds check and the write happen
    /// under the same account lock, so overlapping withdrawals cannot both
    /// pass against a stale balance.
    pub fn withdraw(
        &self,
        wallet_id: WalletId,
        amount: i64,
        memo: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<TransactionId, EngineError> {
        let account_id = self.account_of(wallet_id)?;
        let lock = self.account_lock(account_id)?;
        let _guard = lock.lock().map_err(|_| EngineError::Poisoned)?;

        let tx = Transaction::withdrawal(wallet_id, amount, memo, timestamp)?;
        {
            let state = self.read_state()?;
            let available = state.balances().wallet_balance(wallet_id)?;
            if amount > available {
                warn!(wallet = %wallet_id, amount, available, "withdrawal rejected");
                return Err(LedgerError::insufficient_funds(amount, available).into());
            }
        }

        self.repository
            .persist_transactions(std::slice::from_ref(&tx))?;

        let tx_id = tx.id();
        let mut state = self.write_state()?;
        state.hierarchy.record_transaction(wallet_id, tx_id)?;
        state.ledger.insert(tx);
        drop(state);
        info!(wallet = %wallet_id, amount, "withdrawal recorded");
        Ok(tx_id)
    }

    /// Move money between two wallets of the same account: exactly two
    /// records sharing a pair id, committed as one atomic unit.
    ///
    /// An empty memo defaults to `"<from name> → <to name>"` on both halves.
    pub fn transfer(
        &self,
        from: WalletId,
        to: WalletId,
        amount: i64,
        memo: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<TransferPairId, EngineError> {
        if from == to {
            return Err(LedgerError::SameWallet.into());
        }

        let account_id = {
            let state = self.read_state()?;
            let source = state.hierarchy.account_of(from)?;
            let destination = state.hierarchy.account_of(to)?;
            if source != destination {
                return Err(LedgerError::invalid_argument(
                    "transfer wallets belong to different accounts",
                )
                .into());
            }
            source
        };
        let lock = self.account_lock(account_id)?;
        let _guard = lock.lock().map_err(|_| EngineError::Poisoned)?;

        let memo_text = {
            let state = self.read_state()?;
            let source = state.hierarchy.wallet(from)?;
            let destination = state.hierarchy.wallet(to)?;
            if memo.is_empty() {
                format!("{} → {}", source.name(), destination.name())
            } else {
                memo.to_string()
            }
        };
        let pair = Transaction::transfer_pair(from, to, amount, memo_text, timestamp)?;
        {
            let state = self.read_state()?;
            let available = state.balances().wallet_balance(from)?;
            if amount > available {
                warn!(from = %from, to = %to, amount, available, "transfer rejected");
                return Err(LedgerError::insufficient_funds(amount, available).into());
            }
        }

        self.repository
            .persist_transactions(&[pair.out.clone(), pair.incoming.clone()])?;

        let mut state = self.write_state()?;
        state.hierarchy.record_transaction(from, pair.out.id())?;
        state.hierarchy.record_transaction(to, pair.incoming.id())?;
        state.ledger.insert(pair.out);
        state.ledger.insert(pair.incoming);
        drop(state);
        info!(from = %from, to = %to, amount, pair = %pair.pair_id, "transfer recorded");
        Ok(pair.pair_id)
    }

    // ---- reads (latest committed snapshot, no account lock) ----

    pub fn wallet_balance(&self, wallet_id: WalletId) -> Result<i64, EngineError> {
        Ok(self.read_state()?.balances().wallet_balance(wallet_id)?)
    }

    pub fn account_balance(&self, account_id: AccountId) -> Result<i64, EngineError> {
        Ok(self.read_state()?.balances().account_balance(account_id)?)
    }

    /// A wallet's records, newest first, truncated to `limit`.
    pub fn recent_transactions(
        &self,
        wallet_id: WalletId,
        limit: usize,
    ) -> Result<Vec<Transaction>, EngineError> {
        Ok(self
            .read_state()?
            .balances()
            .recent_transactions(wallet_id, limit)?)
    }

    /// Accounts in creation order.
    pub fn accounts(&self) -> Result<Vec<Account>, EngineError> {
        Ok(self.read_state()?.hierarchy.accounts().cloned().collect())
    }

    /// An account's wallets in creation order; the presentation layer uses
    /// this to validate or reset selection after an account switch.
    pub fn wallets_of(&self, account_id: AccountId) -> Result<Vec<Wallet>, EngineError> {
        let state = self.read_state()?;
        Ok(state
            .hierarchy
            .wallets_of(account_id)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// The owning account of a wallet.
    pub fn account_of(&self, wallet_id: WalletId) -> Result<AccountId, EngineError> {
        Ok(self.read_state()?.hierarchy.account_of(wallet_id)?)
    }

    // ---- internals ----

    fn read_state(&self) -> Result<RwLockReadGuard<'_, LedgerState>, EngineError> {
        self.state.read().map_err(|_| EngineError::Poisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, EngineError> {
        self.state.write().map_err(|_| EngineError::Poisoned)
    }

    /// The exclusive lock serializing mutations for one account. Fails
    /// `NotFound` for ids the hierarchy has never seen or has deleted.
    fn account_lock(&self, account_id: AccountId) -> Result<Arc<Mutex<()>>, EngineError> {
        self.read_state()?.hierarchy.account(account_id)?;
        let mut locks = self.account_locks.lock().map_err(|_| EngineError::Poisoned)?;
        Ok(locks.entry(account_id).or_default().clone())
    }
}
