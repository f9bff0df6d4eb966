use thiserror::Error;

use apiary_store::StoreError;
use apiary_txn::BlobFailure;
use apiary_types::{CellAddressMapping, CompilationStatus, TypeError};

/// Failure of one publish operation.
///
/// Each lifecycle stage maps its own failure here and returns; stages
/// never retry. The variants tell the caller how much state the failed
/// operation left behind.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The request carried no addresses to bind.
    #[error("publish request carries no addresses")]
    NoAddresses,

    /// An address in the request could not be parsed.
    #[error("invalid address: {0}")]
    Address(#[from] TypeError),

    /// The create-or-rebind transaction failed. The store holds none of
    /// its effects.
    #[error("transaction failed: {0}")]
    Transaction(BlobFailure),

    /// The cell could not be fetched back for compilation after its
    /// transaction committed.
    #[error("cell {mapping} unavailable for compilation")]
    CellUnavailable { mapping: CellAddressMapping },

    /// The gate rejected the source. Previously published content is
    /// untouched.
    #[error("compilation failed: {status}")]
    Compilation { status: CompilationStatus },

    /// Compilation succeeded but the durable save-back did not: valid
    /// compiled content exists and is not yet durably visible.
    #[error("save-back failed: {0}")]
    SaveBack(StoreError),

    /// The operation was cancelled between stages.
    #[error("publish cancelled")]
    Cancelled,

    /// Storage failed outside a transaction, during a directory or cell
    /// read.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<BlobFailure> for PublishError {
    fn from(failure: BlobFailure) -> Self {
        match failure {
            BlobFailure::Cancelled => Self::Cancelled,
            other => Self::Transaction(other),
        }
    }
}

impl From<StoreError> for PublishError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

pub type PublishResult<T> = Result<T, PublishError>;

/// Failure wiring a platform context from configuration.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
