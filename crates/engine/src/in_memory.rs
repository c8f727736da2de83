use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockWriteGuard};

use pocketmoney_core::{AccountId, Entity, WalletId};
use pocketmoney_ledger::{Account, Transaction, Wallet};

use crate::repository::{EntityGraph, PersistError, Repository};

/// One entity table keyed by typed id.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: HashMap<E::Id, E>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<E: Entity + Clone> Table<E> {
    fn contains(&self, id: &E::Id) -> bool {
        self.rows.contains_key(id)
    }

    fn insert(&mut self, row: E) {
        self.rows.insert(row.entity_id(), row);
    }

    fn remove(&mut self, id: &E::Id) -> Option<E> {
        self.rows.remove(id)
    }

    fn snapshot(&self) -> Vec<E> {
        self.rows.values().cloned().collect()
    }
}

#[derive(Debug, Default)]
struct Tables {
    accounts: Table<Account>,
    wallets: Table<Wallet>,
    transactions: Table<Transaction>,
}

/// In-memory repository.
///
/// Intended for tests/dev. Every write validates the whole batch against the
/// current tables before touching them, so a rejected call leaves storage
/// exactly as it was.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, PersistError> {
        self.tables
            .write()
            .map_err(|_| PersistError::Storage("lock poisoned".to_string()))
    }
}

impl Repository for InMemoryRepository {
    fn load(&self) -> Result<EntityGraph, PersistError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| PersistError::Storage("lock poisoned".to_string()))?;
        Ok(EntityGraph {
            accounts: tables.accounts.snapshot(),
            wallets: tables.wallets.snapshot(),
            transactions: tables.transactions.snapshot(),
        })
    }

    fn persist_transactions(&self, batch: &[Transaction]) -> Result<(), PersistError> {
        let mut tables = self.write()?;

        let mut batch_ids = HashSet::new();
        for (idx, tx) in batch.iter().enumerate() {
            if !batch_ids.insert(tx.id()) || tables.transactions.contains(&tx.id()) {
                return Err(PersistError::Rejected(format!(
                    "duplicate transaction id (index {idx})"
                )));
            }
            if !tables.wallets.contains(&tx.wallet_id()) {
                return Err(PersistError::Rejected(format!(
                    "transaction references unknown wallet (index {idx})"
                )));
            }
        }

        for tx in batch {
            tables.transactions.insert(tx.clone());
        }
        Ok(())
    }

    fn persist_account(&self, account: &Account, wallets: &[Wallet]) -> Result<(), PersistError> {
        let mut tables = self.write()?;

        if tables.accounts.contains(&account.id()) {
            return Err(PersistError::Rejected("duplicate account id".to_string()));
        }
        for (idx, wallet) in wallets.iter().enumerate() {
            if tables.wallets.contains(&wallet.id()) {
                return Err(PersistError::Rejected(format!(
                    "duplicate wallet id (index {idx})"
                )));
            }
            if wallet.account_id() != account.id() {
                return Err(PersistError::Rejected(format!(
                    "wallet does not belong to the account (index {idx})"
                )));
            }
        }

        tables.accounts.insert(account.clone());
        for wallet in wallets {
            tables.wallets.insert(wallet.clone());
        }
        Ok(())
    }

    fn persist_wallet(&self, wallet: &Wallet) -> Result<(), PersistError> {
        let mut tables = self.write()?;

        if tables.wallets.contains(&wallet.id()) {
            return Err(PersistError::Rejected("duplicate wallet id".to_string()));
        }
        if !tables.accounts.contains(&wallet.account_id()) {
            return Err(PersistError::Rejected(
                "wallet references unknown account".to_string(),
            ));
        }

        tables.wallets.insert(wallet.clone());
        Ok(())
    }

    fn cascade_delete_account(&self, account_id: AccountId) -> Result<(), PersistError> {
        let mut tables = self.write()?;

        if tables.accounts.remove(&account_id).is_none() {
            return Err(PersistError::Rejected("unknown account id".to_string()));
        }

        let owned: HashSet<WalletId> = tables
            .wallets
            .rows
            .values()
            .filter(|w| w.account_id() == account_id)
            .map(Wallet::id)
            .collect();
        tables.wallets.rows.retain(|id, _| !owned.contains(id));
        tables
            .transactions
            .rows
            .retain(|_, tx| !owned.contains(&tx.wallet_id()));
        Ok(())
    }

    fn cascade_delete_wallet(&self, wallet_id: WalletId) -> Result<(), PersistError> {
        let mut tables = self.write()?;

        if tables.wallets.remove(&wallet_id).is_none() {
            return Err(PersistError::Rejected("unknown wallet id".to_string()));
        }
        tables
            .transactions
            .rows
            .retain(|_, tx| tx.wallet_id() != wallet_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pocketmoney_ledger::DEFAULT_ACCOUNT_ICON;

    use super::*;

    fn seeded() -> (InMemoryRepository, Account, Wallet, Wallet) {
        let repo = InMemoryRepository::new();
        let now = Utc::now();
        let account = Account::new("Mio", DEFAULT_ACCOUNT_ICON, now).unwrap();
        let parent = Wallet::parent_of(&account, now);
        let purse = Wallet::purse_of(&account, now);
        repo.persist_account(&account, &[parent.clone(), purse.clone()])
            .unwrap();
        (repo, account, parent, purse)
    }

    #[test]
    fn load_round_trips_persisted_entities() {
        let (repo, account, parent, purse) = seeded();
        let tx = Transaction::deposit(parent.id(), 1000, "gift", Utc::now()).unwrap();
        repo.persist_transactions(std::slice::from_ref(&tx)).unwrap();

        let graph = repo.load().unwrap();
        assert_eq!(graph.accounts, vec![account]);
        assert_eq!(graph.wallets.len(), 2);
        assert!(graph.wallets.contains(&parent));
        assert!(graph.wallets.contains(&purse));
        assert_eq!(graph.transactions, vec![tx]);
    }

    #[test]
    fn transaction_batch_is_all_or_nothing() {
        let (repo, _, parent, _) = seeded();
        let good = Transaction::deposit(parent.id(), 100, "", Utc::now()).unwrap();
        // Second record targets a wallet the store has never seen.
        let bad = Transaction::deposit(WalletId::new(), 100, "", Utc::now()).unwrap();

        let err = repo
            .persist_transactions(&[good.clone(), bad])
            .unwrap_err();
        match err {
            PersistError::Rejected(msg) => assert!(msg.contains("unknown wallet")),
            other => panic!("unexpected error: {other:?}"),
        }

        // The valid half of the batch must not have been applied.
        assert!(repo.load().unwrap().transactions.is_empty());
    }

    #[test]
    fn persist_account_rejects_foreign_wallets() {
        let repo = InMemoryRepository::new();
        let now = Utc::now();
        let account = Account::new("Mio", DEFAULT_ACCOUNT_ICON, now).unwrap();
        let other = Account::new("Ren", DEFAULT_ACCOUNT_ICON, now).unwrap();
        let foreign = Wallet::parent_of(&other, now);

        let err = repo.persist_account(&account, &[foreign]).unwrap_err();
        match err {
            PersistError::Rejected(msg) => assert!(msg.contains("does not belong")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(repo.load().unwrap().accounts.is_empty());
    }

    #[test]
    fn cascade_delete_wallet_removes_its_transactions() {
        let (repo, _, parent, purse) = seeded();
        let keep = Transaction::deposit(parent.id(), 100, "", Utc::now()).unwrap();
        let dropped = Transaction::deposit(purse.id(), 200, "", Utc::now()).unwrap();
        repo.persist_transactions(&[keep.clone(), dropped]).unwrap();

        repo.cascade_delete_wallet(purse.id()).unwrap();

        let graph = repo.load().unwrap();
        assert_eq!(graph.wallets.len(), 1);
        assert_eq!(graph.transactions, vec![keep]);
    }

    #[test]
    fn cascade_delete_account_removes_the_subtree() {
        let (repo, account, parent, _) = seeded();
        let tx = Transaction::deposit(parent.id(), 100, "", Utc::now()).unwrap();
        repo.persist_transactions(std::slice::from_ref(&tx)).unwrap();

        repo.cascade_delete_account(account.id()).unwrap();

        let graph = repo.load().unwrap();
        assert!(graph.accounts.is_empty());
        assert!(graph.wallets.is_empty());
        assert!(graph.transactions.is_empty());
    }
}
