//! `pocketmoney-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the domain error taxonomy, and the minimal
//! entity trait shared by the ledger and its storage.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{EntityKind, LedgerError, LedgerResult};
pub use id::{AccountId, TransactionId, TransferPairId, WalletId};
