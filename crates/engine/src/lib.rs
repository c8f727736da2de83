//! Ledger engine and its storage seams.
//!
//! This crate composes the pure domain (`pocketmoney-ledger`) with two
//! external collaborators behind traits: a [`Repository`] that persists and
//! cascade-deletes entities, and a [`SelectionStore`] that remembers the
//! user's active account/wallet. [`LedgerEngine`] is the single writer.

pub mod engine;
pub mod in_memory;
pub mod repository;
pub mod selection;


pub use engine::{EngineError, LedgerEngine};
pub use in_memory::InMemoryRepository;
pub use repository::{EntityGraph, PersistError, Repository};
pub use selection::{InMemorySelectionStore, SelectionStore};
