use std::collections::HashMap;
use std::sync::RwLock;

use crate::backend::TierBackend;
use crate::error::StoreResult;
use crate::key::BlobKey;
use crate::record::BlobRecord;
use crate::tier::CacheTier;

/// In-memory, HashMap-based tier backend.
///
/// Serves as the local cache tier in every deployment, stands in for the
/// shared cache in single-process ones, and backs durable replicas in
/// tests. All records are held behind a `RwLock` and cloned on read/write.
pub struct MemoryTier {
    tier: CacheTier,
    records: RwLock<HashMap<BlobKey, BlobRecord>>,
}

impl MemoryTier {
    /// Create an empty backend serving the given tier.
    pub fn new(tier: CacheTier) -> Self {
        Self {
            tier,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }

    /// Total payload bytes across all records.
    pub fn total_bytes(&self) -> u64 {
        self.records
            .read()
            .expect("lock poisoned")
            .values()
            .map(|record| record.size())
            .sum()
    }

    /// Remove all records.
    pub fn clear(&self) {
        self.records.write().expect("lock poisoned").clear();
    }

    /// All keys currently held, in canonical order.
    pub fn all_keys(&self) -> Vec<BlobKey> {
        let map = self.records.read().expect("lock poisoned");
        let mut keys: Vec<BlobKey> = map.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl TierBackend for MemoryTier {
    fn tier(&self) -> CacheTier {
        self.tier
    }

    fn read(&self, key: &BlobKey) -> StoreResult<Option<BlobRecord>> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn write(&self, key: &BlobKey, record: &BlobRecord) -> StoreResult<()> {
        let mut map = self.records.write().expect("lock poisoned");
        map.insert(key.clone(), record.clone());
        Ok(())
    }

    fn evict(&self, key: &BlobKey) -> StoreResult<bool> {
        let mut map = self.records.write().expect("lock poisoned");
        Ok(map.remove(key).is_some())
    }

    fn contains(&self, key: &BlobKey) -> StoreResult<bool> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }
}

impl std::fmt::Debug for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTier")
            .field("tier", &self.tier)
            .field("record_count", &self.len())
            .finish()
    }
}
