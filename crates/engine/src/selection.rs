use std::sync::{Arc, PoisonError, RwLock};

use pocketmoney_core::{AccountId, WalletId};

/// The user's currently active account and wallet.
///
/// Consumed by the engine, not owned by it: the presentation layer reads and
/// writes selection too, and enforces that a present wallet selection belongs
/// to the selected account (re-validating through
/// [`crate::LedgerEngine::wallets_of`] after an account switch). The engine
/// only writes selection at the explicit points where the hierarchy changed
/// under it: account creation and cascading deletes.
pub trait SelectionStore: Send + Sync {
    fn selected_account(&self) -> Option<AccountId>;
    fn set_selected_account(&self, id: Option<AccountId>);
    fn selected_wallet(&self) -> Option<WalletId>;
    fn set_selected_wallet(&self, id: Option<WalletId>);
}

impl<S> SelectionStore for Arc<S>
where
    S: SelectionStore + ?Sized,
{
    fn selected_account(&self) -> Option<AccountId> {
        (**self).selected_account()
    }

    fn set_selected_account(&self, id: Option<AccountId>) {
        (**self).set_selected_account(id)
    }

    fn selected_wallet(&self) -> Option<WalletId> {
        (**self).selected_wallet()
    }

    fn set_selected_wallet(&self, id: Option<WalletId>) {
        (**self).set_selected_wallet(id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Selection {
    account: Option<AccountId>,
    wallet: Option<WalletId>,
}

/// Process-local selection store.
///
/// Selection is a preference, not ledger state: a poisoned lock degrades to
/// the last written value instead of failing the operation that touched it.
#[derive(Debug, Default)]
pub struct InMemorySelectionStore {
    inner: RwLock<Selection>,
}

impl InMemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStore for InMemorySelectionStore {
    fn selected_account(&self) -> Option<AccountId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .account
    }

    fn set_selected_account(&self, id: Option<AccountId>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .account = id;
    }

    fn selected_wallet(&self) -> Option<WalletId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .wallet
    }

    fn set_selected_wallet(&self, id: Option<WalletId>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .wallet = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_starts_empty_and_round_trips() {
        let store = InMemorySelectionStore::new();
        assert_eq!(store.selected_account(), None);
        assert_eq!(store.selected_wallet(), None);

        let account = AccountId::new();
        let wallet = WalletId::new();
        store.set_selected_account(Some(account));
        store.set_selected_wallet(Some(wallet));
        assert_eq!(store.selected_account(), Some(account));
        assert_eq!(store.selected_wallet(), Some(wallet));

        store.set_selected_wallet(None);
        assert_eq!(store.selected_wallet(), None);
    }
}
