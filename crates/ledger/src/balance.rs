use std::cmp::Reverse;

use pocketmoney_core::{AccountId, LedgerResult, WalletId};

use crate::hierarchy::{AccountHierarchy, Wallet};
use crate::ledger::Ledger;
use crate::transaction::Transaction;

/// Pure derivation of balances from the transaction log.
///
/// A borrowing view over the current hierarchy and ledger; holds no state and
/// caches nothing, so every call reflects exactly the committed records. The
/// fold is the source of truth for balance — there is no stored counter that
/// could drift from it.
#[derive(Debug, Clone, Copy)]
pub struct BalanceCalculator<'a> {
    hierarchy: &'a AccountHierarchy,
    ledger: &'a Ledger,
}

impl<'a> BalanceCalculator<'a> {
    pub fn new(hierarchy: &'a AccountHierarchy, ledger: &'a Ledger) -> Self {
        Self { hierarchy, ledger }
    }

    /// `Σ(Deposit) + Σ(TransferIn) − Σ(Withdrawal) − Σ(TransferOut)` over the
    /// wallet's records.
    pub fn wallet_balance(&self, wallet_id: WalletId) -> LedgerResult<i64> {
        let wallet = self.hierarchy.wallet(wallet_id)?;
        Ok(self.fold(wallet))
    }

    /// Sum of `wallet_balance` over the account's wallets.
    pub fn account_balance(&self, account_id: AccountId) -> LedgerResult<i64> {
        let mut total = 0;
        for wallet in self.hierarchy.wallets_of(account_id)? {
            total += self.fold(wallet);
        }
        Ok(total)
    }

    /// The wallet's records, newest first (ties keep insertion order),
    /// truncated to `limit`.
    pub fn recent_transactions(
        &self,
        wallet_id: WalletId,
        limit: usize,
    ) -> LedgerResult<Vec<Transaction>> {
        let wallet = self.hierarchy.wallet(wallet_id)?;
        let mut records: Vec<Transaction> =
            self.ledger.wallet_transactions(wallet).cloned().collect();
        records.sort_by_key(|t| Reverse(t.timestamp()));
        records.truncate(limit);
        Ok(records)
    }

    fn fold(&self, wallet: &Wallet) -> i64 {
        self.ledger
            .wallet_transactions(wallet)
            .map(Transaction::signed_amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use pocketmoney_core::{EntityKind, LedgerError};
    use proptest::prelude::*;

    use super::*;
    use crate::hierarchy::{Account, DEFAULT_ACCOUNT_ICON};

    struct Fixture {
        hierarchy: AccountHierarchy,
        ledger: Ledger,
        account: AccountId,
        parent: WalletId,
        purse: WalletId,
    }

    fn fixture() -> Fixture {
        let now = Utc::now();
        let mut hierarchy = AccountHierarchy::new();
        let account = Account::new("Mio", DEFAULT_ACCOUNT_ICON, now).unwrap();
        let parent = Wallet::parent_of(&account, now);
        let purse = Wallet::purse_of(&account, now);
        let (account_id, parent_id, purse_id) = (account.id(), parent.id(), purse.id());
        hierarchy.insert_account(account);
        hierarchy.insert_wallet(parent).unwrap();
        hierarchy.insert_wallet(purse).unwrap();
        Fixture {
            hierarchy,
            ledger: Ledger::new(),
            account: account_id,
            parent: parent_id,
            purse: purse_id,
        }
    }

    impl Fixture {
        fn apply(&mut self, tx: Transaction) {
            self.hierarchy
                .record_transaction(tx.wallet_id(), tx.id())
                .unwrap();
            self.ledger.insert(tx);
        }

        fn deposit(&mut self, wallet: WalletId, amount: i64, at: DateTime<Utc>) {
            self.apply(Transaction::deposit(wallet, amount, "", at).unwrap());
        }

        fn withdraw(&mut self, wallet: WalletId, amount: i64, at: DateTime<Utc>) {
            self.apply(Transaction::withdrawal(wallet, amount, "", at).unwrap());
        }

        fn transfer(&mut self, from: WalletId, to: WalletId, amount: i64, at: DateTime<Utc>) {
            let pair = Transaction::transfer_pair(from, to, amount, "", at).unwrap();
            self.apply(pair.out);
            self.apply(pair.incoming);
        }
    }

    #[test]
    fn empty_wallet_has_zero_balance() {
        let f = fixture();
        let calc = BalanceCalculator::new(&f.hierarchy, &f.ledger);
        assert_eq!(calc.wallet_balance(f.parent).unwrap(), 0);
        assert_eq!(calc.account_balance(f.account).unwrap(), 0);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let f = fixture();
        let calc = BalanceCalculator::new(&f.hierarchy, &f.ledger);
        assert_eq!(
            calc.wallet_balance(WalletId::new()).unwrap_err(),
            LedgerError::NotFound(EntityKind::Wallet)
        );
        assert_eq!(
            calc.account_balance(AccountId::new()).unwrap_err(),
            LedgerError::NotFound(EntityKind::Account)
        );
        assert_eq!(
            calc.recent_transactions(WalletId::new(), 5).unwrap_err(),
            LedgerError::NotFound(EntityKind::Wallet)
        );
    }

    #[test]
    fn account_balance_sums_wallets() {
        let mut f = fixture();
        let now = Utc::now();
        f.deposit(f.parent, 1000, now);
        f.transfer(f.parent, f.purse, 400, now);
        f.withdraw(f.purse, 150, now);

        let calc = BalanceCalculator::new(&f.hierarchy, &f.ledger);
        assert_eq!(calc.wallet_balance(f.parent).unwrap(), 600);
        assert_eq!(calc.wallet_balance(f.purse).unwrap(), 250);
        assert_eq!(calc.account_balance(f.account).unwrap(), 850);
    }

    #[test]
    fn recent_transactions_orders_newest_first_with_stable_ties() {
        let mut f = fixture();
        let base = Utc::now();
        f.deposit(f.parent, 1, base);
        f.deposit(f.parent, 2, base + Duration::seconds(10));
        // Two records at the same instant keep insertion order.
        f.deposit(f.parent, 3, base + Duration::seconds(5));
        f.deposit(f.parent, 4, base + Duration::seconds(5));

        let calc = BalanceCalculator::new(&f.hierarchy, &f.ledger);
        let amounts: Vec<i64> = calc
            .recent_transactions(f.parent, 10)
            .unwrap()
            .iter()
            .map(Transaction::amount)
            .collect();
        assert_eq!(amounts, vec![2, 3, 4, 1]);
    }

    #[test]
    fn recent_transactions_truncates_to_limit() {
        let mut f = fixture();
        let base = Utc::now();
        for i in 0..8 {
            f.deposit(f.parent, 100 + i, base + Duration::seconds(i));
        }
        let calc = BalanceCalculator::new(&f.hierarchy, &f.ledger);
        let recent = calc.recent_transactions(f.parent, 5).unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].amount(), 107);
    }

    proptest! {
        /// For any sequence of deposits, withdrawals, and transfers, the
        /// derived balance equals the signed-sum formula, and the account
        /// balance equals the sum over its wallets.
        #[test]
        fn balance_matches_signed_formula(
            ops in prop::collection::vec((0u8..4u8, 1i64..1_000_000i64), 0..40)
        ) {
            let mut f = fixture();
            let now = Utc::now();

            let mut deposits: i64 = 0;
            let mut withdrawals: i64 = 0;
            let mut transfers_in: i64 = 0;
            let mut transfers_out: i64 = 0;

            for (op, amount) in ops {
                match op {
                    0 => {
                        f.deposit(f.parent, amount, now);
                        deposits += amount;
                    }
                    1 => {
                        f.withdraw(f.parent, amount, now);
                        withdrawals += amount;
                    }
                    2 => {
                        f.transfer(f.parent, f.purse, amount, now);
                        transfers_out += amount;
                    }
                    _ => {
                        f.transfer(f.purse, f.parent, amount, now);
                        transfers_in += amount;
                    }
                }
            }

            let calc = BalanceCalculator::new(&f.hierarchy, &f.ledger);
            let expected = deposits + transfers_in - withdrawals - transfers_out;
            prop_assert_eq!(calc.wallet_balance(f.parent).unwrap(), expected);

            let wallet_sum = calc.wallet_balance(f.parent).unwrap()
                + calc.wallet_balance(f.purse).unwrap();
            prop_assert_eq!(calc.account_balance(f.account).unwrap(), wallet_sum);

            // Transfers move value inside the account; only deposits and
            // withdrawals change the total.
            prop_assert_eq!(
                calc.account_balance(f.account).unwrap(),
                deposits - withdrawals
            );
        }
    }
}
