use crate::record::BlobKind;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The stored bytes are malformed or fail their integrity check.
    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// A record decoded as a different kind than the caller asked for.
    #[error("wrong record kind: expected {expected}, got {actual}")]
    WrongKind { expected: BlobKind, actual: BlobKind },

    /// A durable write was requested but the store has no durable replicas.
    #[error("no durable tier configured")]
    NoDurableTier,

    /// Every durable replica rejected the write.
    #[error("durable write failed on all {replicas} replicas")]
    DurableWriteFailed { replicas: u32 },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
