use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pocketmoney_core::{
    AccountId, Entity, EntityKind, LedgerError, LedgerResult, TransactionId, WalletId,
};

/// Icon shown for accounts created without an explicit choice.
pub const DEFAULT_ACCOUNT_ICON: &str = "person.circle.fill";

/// Icon shown for wallets created without an explicit choice.
pub const DEFAULT_WALLET_ICON: &str = "banknote";

// Wallet pair provisioned with every new account. The parent wallet is where
// deposits land by default; the purse is the child's spending money.
const PARENT_WALLET_NAME: &str = "Parent";
const PARENT_WALLET_ICON: &str = "building.columns";
const PURSE_WALLET_NAME: &str = "Purse";
const PURSE_WALLET_ICON: &str = "wallet.bifold";

fn validated_name(name: &str, what: &str) -> LedgerResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::invalid_argument(format!(
            "{what} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// A child-facing account: a name, an icon, and the wallets it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    name: String,
    icon: String,
    created_at: DateTime<Utc>,
    /// Owned wallets in creation order. Runtime index, rebuilt at hydration
    /// from each wallet's back-reference.
    #[serde(skip)]
    wallet_ids: Vec<WalletId>,
}

impl Account {
    /// Build a new account. The name must be non-empty after trimming.
    pub fn new(name: &str, icon: &str, created_at: DateTime<Utc>) -> LedgerResult<Self> {
        Ok(Self {
            id: AccountId::new(),
            name: validated_name(name, "account")?,
            icon: icon.to_string(),
            created_at,
            wallet_ids: Vec::new(),
        })
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Owned wallet ids in creation order.
    pub fn wallet_ids(&self) -> &[WalletId] {
        &self.wallet_ids
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn entity_id(&self) -> AccountId {
        self.id
    }
}

/// A named sub-account of money within an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    id: WalletId,
    /// Back-reference to the owning account (an id lookup, not ownership).
    account_id: AccountId,
    name: String,
    icon: String,
    created_at: DateTime<Utc>,
    is_default: bool,
    /// Owned transaction ids in insertion order. Runtime index, rebuilt at
    /// hydration from each record's back-reference.
    #[serde(skip)]
    transaction_ids: Vec<TransactionId>,
}

impl Wallet {
    /// Build a wallet added to an existing account (never the default one;
    /// the default wallet exists from account creation).
    pub fn new(
        account_id: AccountId,
        name: &str,
        icon: &str,
        created_at: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        Ok(Self::build(
            account_id,
            validated_name(name, "wallet")?,
            icon,
            false,
            created_at,
        ))
    }

    /// The default wallet provisioned with a new account.
    pub fn parent_of(account: &Account, created_at: DateTime<Utc>) -> Self {
        Self::build(
            account.id(),
            PARENT_WALLET_NAME.to_string(),
            PARENT_WALLET_ICON,
            true,
            created_at,
        )
    }

    /// The spending wallet provisioned alongside the parent wallet.
    pub fn purse_of(account: &Account, created_at: DateTime<Utc>) -> Self {
        Self::build(
            account.id(),
            PURSE_WALLET_NAME.to_string(),
            PURSE_WALLET_ICON,
            false,
            created_at,
        )
    }

    fn build(
        account_id: AccountId,
        name: String,
        icon: &str,
        is_default: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WalletId::new(),
            account_id,
            name,
            icon: icon.to_string(),
            created_at,
            is_default,
            transaction_ids: Vec::new(),
        }
    }

    pub fn id(&self) -> WalletId {
        self.id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Owned transaction ids in insertion order.
    pub fn transaction_ids(&self) -> &[TransactionId] {
        &self.transaction_ids
    }
}

impl Entity for Wallet {
    type Id = WalletId;

    fn entity_id(&self) -> WalletId {
        self.id
    }
}

/// Arena of accounts and wallets keyed by id.
///
/// Ownership runs downward through plain id lists (account → wallets →
/// transactions); deletion explicitly walks those lists instead of relying on
/// framework-managed cascades. Back-references are id lookups, so no
/// ownership cycle exists.
#[derive(Debug, Clone, Default)]
pub struct AccountHierarchy {
    /// Account ids in creation order.
    order: Vec<AccountId>,
    accounts: HashMap<AccountId, Account>,
    wallets: HashMap<WalletId, Wallet>,
}

impl AccountHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&mut self, account: Account) {
        self.order.push(account.id());
        self.accounts.insert(account.id(), account);
    }

    /// Attach a wallet to its owning account.
    pub fn insert_wallet(&mut self, wallet: Wallet) -> LedgerResult<()> {
        let account = self
            .accounts
            .get_mut(&wallet.account_id())
            .ok_or(LedgerError::NotFound(EntityKind::Account))?;
        account.wallet_ids.push(wallet.id());
        self.wallets.insert(wallet.id(), wallet);
        Ok(())
    }

    /// Append a transaction id to its wallet's owned list.
    pub fn record_transaction(
        &mut self,
        wallet_id: WalletId,
        transaction_id: TransactionId,
    ) -> LedgerResult<()> {
        let wallet = self
            .wallets
            .get_mut(&wallet_id)
            .ok_or(LedgerError::NotFound(EntityKind::Wallet))?;
        wallet.transaction_ids.push(transaction_id);
        Ok(())
    }

    /// Detach and return a wallet, including its owned transaction ids so the
    /// caller can drop the records from the ledger.
    pub fn remove_wallet(&mut self, wallet_id: WalletId) -> LedgerResult<Wallet> {
        let wallet = self
            .wallets
            .remove(&wallet_id)
            .ok_or(LedgerError::NotFound(EntityKind::Wallet))?;
        if let Some(account) = self.accounts.get_mut(&wallet.account_id()) {
            account.wallet_ids.retain(|id| *id != wallet_id);
        }
        Ok(wallet)
    }

    /// Detach and return an account with all of its wallets.
    pub fn remove_account(&mut self, account_id: AccountId) -> LedgerResult<(Account, Vec<Wallet>)> {
        let account = self
            .accounts
            .remove(&account_id)
            .ok_or(LedgerError::NotFound(EntityKind::Account))?;
        self.order.retain(|id| *id != account_id);
        let wallets = account
            .wallet_ids
            .iter()
            .filter_map(|id| self.wallets.remove(id))
            .collect();
        Ok((account, wallets))
    }

    pub fn account(&self, id: AccountId) -> LedgerResult<&Account> {
        self.accounts
            .get(&id)
            .ok_or(LedgerError::NotFound(EntityKind::Account))
    }

    pub fn wallet(&self, id: WalletId) -> LedgerResult<&Wallet> {
        self.wallets
            .get(&id)
            .ok_or(LedgerError::NotFound(EntityKind::Wallet))
    }

    /// Owning account of a wallet.
    pub fn account_of(&self, wallet_id: WalletId) -> LedgerResult<AccountId> {
        Ok(self.wallet(wallet_id)?.account_id())
    }

    /// Accounts in creation order.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.order.iter().filter_map(|id| self.accounts.get(id))
    }

    /// An account's wallets in creation order.
    pub fn wallets_of(&self, account_id: AccountId) -> LedgerResult<Vec<&Wallet>> {
        let account = self.account(account_id)?;
        Ok(account
            .wallet_ids
            .iter()
            .filter_map(|id| self.wallets.get(id))
            .collect())
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }
}
