//! Multi-blob transactions for the apiary cell platform.
//!
//! Every mutation of cells, address bindings, and user records goes
//! through a [`BlobTransaction`] performed by the [`TransactionEngine`].
//! A transaction touches several blobs but presents an all-or-nothing
//! contract: on any failure the engine rolls its durable writes back and
//! reports a single [`BlobFailure`].
//!
//! Conflicting transactions (same cell, same address) serialize on a
//! per-key lock table; transactions over disjoint key sets run
//! concurrently. Durable writes are fanned out to replicas by the store;
//! the engine checks each blob's acknowledgement count against the
//! transaction's [`Quorum`].

pub mod engine;
pub mod error;
pub mod quorum;
pub mod receipt;
pub mod transaction;

pub use engine::{TransactionEngine, TransactionRunner};
pub use error::{BlobFailure, TxnResult};
pub use quorum::Quorum;
pub use receipt::{TxnId, TxnReceipt};
pub use transaction::{BlobTransaction, TxnKind};
