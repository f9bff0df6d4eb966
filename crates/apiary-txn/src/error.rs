use apiary_store::StoreError;
use apiary_types::{CellAddress, CellAddressMapping};

/// The one failure type a transaction reports.
///
/// Whatever goes wrong below the transaction boundary, callers see a
/// `BlobFailure` and may rely on the store holding no partial effects of
/// the failed transaction.
#[derive(Debug, thiserror::Error)]
pub enum BlobFailure {
    /// Create targeted a coordinate that already holds a cell.
    #[error("cell already exists at {mapping}")]
    CellExists { mapping: CellAddressMapping },

    /// The transaction targeted a coordinate with no cell.
    #[error("no cell at {mapping}")]
    CellMissing { mapping: CellAddressMapping },

    /// An address is already bound to a different cell.
    #[error("address {address} is already bound to {bound_to}")]
    AddressConflict {
        address: CellAddress,
        bound_to: CellAddressMapping,
    },

    /// Too few durable replicas acknowledged a blob write.
    #[error("durable quorum not reached: required {required}, acked {acked}")]
    QuorumNotReached { required: u32, acked: u32 },

    /// The lock set kept shifting under concurrent rebinds.
    #[error("transaction gave up under contention")]
    Contended,

    /// The request's cancel token fired before the first durable write.
    #[error("transaction cancelled")]
    Cancelled,

    /// Storage failed underneath the transaction.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// Result alias for transaction operations.
pub type TxnResult<T> = Result<T, BlobFailure>;
