use std::collections::HashMap;

use pocketmoney_core::TransactionId;

use crate::hierarchy::Wallet;
use crate::transaction::Transaction;

/// Flat store of immutable transaction records, keyed by id.
///
/// No behavior beyond storage and lookup: validation happens before a record
/// is constructed, ordering lives on each wallet's id list, and balances are
/// derived by [`crate::BalanceCalculator`].
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    transactions: HashMap<TransactionId, Transaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, transaction: Transaction) {
        self.transactions.insert(transaction.id(), transaction);
    }

    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.get(&id)
    }

    pub fn remove(&mut self, id: TransactionId) -> Option<Transaction> {
        self.transactions.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// All records, in no particular order.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    /// A wallet's records in insertion order, resolved through its id list.
    pub fn wallet_transactions<'a>(
        &'a self,
        wallet: &'a Wallet,
    ) -> impl Iterator<Item = &'a Transaction> {
        wallet
            .transaction_ids()
            .iter()
            .filter_map(|id| self.transactions.get(id))
    }
}
