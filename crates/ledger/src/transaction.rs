use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pocketmoney_core::{Entity, LedgerError, LedgerResult, TransactionId, TransferPairId, WalletId};

/// What a transaction does to its wallet's balance.
///
/// Serialized camelCase to stay compatible with records written by the
/// original mobile app.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
}

impl TransactionKind {
    /// Whether this kind adds to the wallet's balance.
    pub fn is_inflow(self) -> bool {
        matches!(self, TransactionKind::Deposit | TransactionKind::TransferIn)
    }

    /// Whether this kind is one half of a transfer pair.
    pub fn is_transfer(self) -> bool {
        matches!(
            self,
            TransactionKind::TransferIn | TransactionKind::TransferOut
        )
    }
}

/// One immutable ledger record.
///
/// Records are append-only: once constructed they are never edited, and they
/// disappear only when their owning wallet or account is cascade-deleted.
/// The constructors are the single place the `amount > 0` invariant is
/// enforced, so a `Transaction` value is valid by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    wallet_id: WalletId,
    kind: TransactionKind,
    /// Positive amount in the smallest currency unit.
    amount: i64,
    memo: String,
    timestamp: DateTime<Utc>,
    /// Present iff `kind` is one half of a transfer pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transfer_pair_id: Option<TransferPairId>,
}

impl Transaction {
    fn record(
        wallet_id: WalletId,
        kind: TransactionKind,
        amount: i64,
        memo: String,
        timestamp: DateTime<Utc>,
        transfer_pair_id: Option<TransferPairId>,
    ) -> LedgerResult<Self> {
        if amount <= 0 {
            return Err(LedgerError::invalid_amount(amount));
        }
        Ok(Self {
            id: TransactionId::new(),
            wallet_id,
            kind,
            amount,
            memo,
            timestamp,
            transfer_pair_id,
        })
    }

    /// Money entering the system into `wallet_id`.
    pub fn deposit(
        wallet_id: WalletId,
        amount: i64,
        memo: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        Self::record(
            wallet_id,
            TransactionKind::Deposit,
            amount,
            memo.into(),
            timestamp,
            None,
        )
    }

    /// Money leaving the system from `wallet_id`.
    pub fn withdrawal(
        wallet_id: WalletId,
        amount: i64,
        memo: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        Self::record(
            wallet_id,
            TransactionKind::Withdrawal,
            amount,
            memo.into(),
            timestamp,
            None,
        )
    }

    /// Both halves of one movement of value between two wallets: a
    /// TransferOut on `from` and a TransferIn on `to`, sharing a freshly
    /// generated pair id, amount, memo, and timestamp.
    pub fn transfer_pair(
        from: WalletId,
        to: WalletId,
        amount: i64,
        memo: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> LedgerResult<TransferPair> {
        if from == to {
            return Err(LedgerError::SameWallet);
        }
        let pair_id = TransferPairId::new();
        let memo = memo.into();
        let out = Self::record(
            from,
            TransactionKind::TransferOut,
            amount,
            memo.clone(),
            timestamp,
            Some(pair_id),
        )?;
        let incoming = Self::record(
            to,
            TransactionKind::TransferIn,
            amount,
            memo,
            timestamp,
            Some(pair_id),
        )?;
        Ok(TransferPair {
            pair_id,
            out,
            incoming,
        })
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn wallet_id(&self) -> WalletId {
        self.wallet_id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn transfer_pair_id(&self) -> Option<TransferPairId> {
        self.transfer_pair_id
    }

    /// The record's contribution to its wallet's balance.
    pub fn signed_amount(&self) -> i64 {
        if self.kind.is_inflow() {
            self.amount
        } else {
            -self.amount
        }
    }
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn entity_id(&self) -> TransactionId {
        self.id
    }
}

/// The two records of one transfer, created together and committed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPair {
    pub pair_id: TransferPairId,
    pub out: Transaction,
    pub incoming: Transaction,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn deposit_rejects_non_positive_amounts() {
        let wallet = WalletId::new();
        for amount in [0, -1, -500] {
            let err = Transaction::deposit(wallet, amount, "", test_time()).unwrap_err();
            assert_eq!(err, LedgerError::invalid_amount(amount));
        }
    }

    #[test]
    fn signed_amount_follows_kind() {
        let wallet = WalletId::new();
        let deposit = Transaction::deposit(wallet, 300, "gift", test_time()).unwrap();
        let withdrawal = Transaction::withdrawal(wallet, 120, "candy", test_time()).unwrap();
        assert_eq!(deposit.signed_amount(), 300);
        assert_eq!(withdrawal.signed_amount(), -120);
    }

    #[test]
    fn transfer_pair_shares_id_amount_and_memo() {
        let from = WalletId::new();
        let to = WalletId::new();
        let pair = Transaction::transfer_pair(from, to, 400, "savings", test_time()).unwrap();

        assert_eq!(pair.out.kind(), TransactionKind::TransferOut);
        assert_eq!(pair.incoming.kind(), TransactionKind::TransferIn);
        assert!(pair.out.kind().is_transfer());
        assert!(pair.incoming.kind().is_transfer());
        assert_eq!(pair.out.wallet_id(), from);
        assert_eq!(pair.incoming.wallet_id(), to);
        assert_eq!(pair.out.amount(), pair.incoming.amount());
        assert_eq!(pair.out.memo(), pair.incoming.memo());
        assert_eq!(pair.out.transfer_pair_id(), Some(pair.pair_id));
        assert_eq!(pair.incoming.transfer_pair_id(), Some(pair.pair_id));
        assert_ne!(pair.out.id(), pair.incoming.id());
        assert_eq!(pair.out.signed_amount() + pair.incoming.signed_amount(), 0);
    }

    #[test]
    fn transfer_pair_rejects_same_wallet_before_amount() {
        let wallet = WalletId::new();
        let err = Transaction::transfer_pair(wallet, wallet, -5, "", test_time()).unwrap_err();
        assert_eq!(err, LedgerError::SameWallet);
    }

    #[test]
    fn kind_serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::TransferIn).unwrap(),
            "\"transferIn\""
        );
        assert_eq!(
            serde_json::from_str::<TransactionKind>("\"withdrawal\"").unwrap(),
            TransactionKind::Withdrawal
        );
    }
}
