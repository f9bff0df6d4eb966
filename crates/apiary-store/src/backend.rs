use crate::error::StoreResult;
use crate::key::BlobKey;
use crate::record::BlobRecord;
use crate::tier::CacheTier;

/// Backing store for a single cache tier.
///
/// All implementations must satisfy these invariants:
/// - `read` returns `Ok(None)` for a key that was never written or has
///   been evicted; `Err` is reserved for I/O failure and corruption.
/// - `write` replaces any existing record for the key. Records are
///   mutable state, not content-addressed objects.
/// - Concurrent access from multiple threads is safe.
/// - The backend never interprets record payloads.
pub trait TierBackend: Send + Sync {
    /// The tier this backend serves. Used for routing and log context.
    fn tier(&self) -> CacheTier;

    /// Read the record for a key. `Ok(None)` means a clean miss.
    fn read(&self, key: &BlobKey) -> StoreResult<Option<BlobRecord>>;

    /// Write (or replace) the record for a key.
    fn write(&self, key: &BlobKey, record: &BlobRecord) -> StoreResult<()>;

    /// Drop the record for a key. Returns `true` if one was present.
    fn evict(&self, key: &BlobKey) -> StoreResult<bool>;

    /// Whether a record exists for the key.
    ///
    /// Default implementation reads the record and discards it. Backends
    /// may override when existence can be answered more cheaply.
    fn contains(&self, key: &BlobKey) -> StoreResult<bool> {
        Ok(self.read(key)?.is_some())
    }
}
