use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::TierBackend;
use crate::error::{StoreError, StoreResult};
use crate::key::BlobKey;
use crate::record::BlobRecord;
use crate::tier::{CacheTier, TierSet};

/// Outcome of a tiered write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Durable replicas that acknowledged the write.
    pub durable_acks: u32,
    /// Durable replicas configured in the store.
    pub durable_replicas: u32,
    /// Cache-tier writes that succeeded.
    pub cache_writes: u32,
    /// Cache-tier writes that failed (logged, never surfaced).
    pub cache_failures: u32,
}

/// The storage seam the transaction engine and orchestrator talk to.
///
/// Callers name the tiers each operation touches; the store owns the
/// mechanics of fall-through, promotion, and replica fan-out.
pub trait BlobStore: Send + Sync {
    /// Read a record, consulting tiers in the set's order.
    ///
    /// `Ok(None)` means no consulted tier holds the record. A tier that
    /// errors is skipped; the error only surfaces when no tier could
    /// answer at all.
    fn read(&self, key: &BlobKey, tiers: &TierSet) -> StoreResult<Option<BlobRecord>>;

    /// Write a record to exactly the requested tiers.
    ///
    /// A durable write is authoritative: it fans out to every replica and
    /// fails only when no replica acknowledges. Cache-tier writes are
    /// best-effort and never fail the call.
    fn write(&self, key: &BlobKey, record: &BlobRecord, tiers: &TierSet)
        -> StoreResult<WriteReport>;

    /// Remove a record from the requested tiers.
    fn evict(&self, key: &BlobKey, tiers: &TierSet) -> StoreResult<()>;
}

/// Multi-tier store: optional local and shared cache backends plus one or
/// more durable replicas.
///
/// After a durable write the key is evicted from any cache tier the write
/// set did not cover, so no tier can keep serving content older than the
/// last durable write; fall-through reads then re-warm the caches.
pub struct TieredStore {
    local: Option<Arc<dyn TierBackend>>,
    shared: Option<Arc<dyn TierBackend>>,
    durable: Vec<Arc<dyn TierBackend>>,
}

impl TieredStore {
    /// Create a store with no backends. Wire tiers with the `with_*`
    /// methods; a store used for durable writes needs at least one
    /// durable replica.
    pub fn new() -> Self {
        Self {
            local: None,
            shared: None,
            durable: Vec::new(),
        }
    }

    pub fn with_local(mut self, backend: Arc<dyn TierBackend>) -> Self {
        self.local = Some(backend);
        self
    }

    pub fn with_shared(mut self, backend: Arc<dyn TierBackend>) -> Self {
        self.shared = Some(backend);
        self
    }

    /// Add a durable replica. Replicas are written in the order added.
    pub fn with_durable(mut self, backend: Arc<dyn TierBackend>) -> Self {
        self.durable.push(backend);
        self
    }

    pub fn durable_replicas(&self) -> usize {
        self.durable.len()
    }

    fn cache_backend(&self, tier: CacheTier) -> Option<&Arc<dyn TierBackend>> {
        match tier {
            CacheTier::Local => self.local.as_ref(),
            CacheTier::Shared => self.shared.as_ref(),
            CacheTier::Durable => None,
        }
    }

    /// Best-effort backfill of a hit into faster tiers that missed.
    fn promote(&self, key: &BlobKey, record: &BlobRecord, missed: &[&Arc<dyn TierBackend>]) {
        for backend in missed {
            if let Err(e) = backend.write(key, record) {
                warn!(key = %key, tier = %backend.tier(), error = %e, "cache promotion failed");
            }
        }
    }
}

impl Default for TieredStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for TieredStore {
    fn read(&self, key: &BlobKey, tiers: &TierSet) -> StoreResult<Option<BlobRecord>> {
        let mut missed: Vec<&Arc<dyn TierBackend>> = Vec::new();
        let mut last_err: Option<StoreError> = None;
        let mut clean_miss = false;

        for tier in tiers.iter() {
            if tier.is_durable() {
                if self.durable.is_empty() {
                    return Err(StoreError::NoDurableTier);
                }
                for replica in &self.durable {
                    match replica.read(key) {
                        Ok(Some(record)) => {
                            self.promote(key, &record, &missed);
                            return Ok(Some(record));
                        }
                        // A lagging replica may miss what another holds, so
                        // a miss here does not end the scan.
                        Ok(None) => clean_miss = true,
                        Err(e) => {
                            warn!(key = %key, error = %e, "durable replica read failed");
                            last_err = Some(e);
                        }
                    }
                }
            } else if let Some(backend) = self.cache_backend(tier) {
                match backend.read(key) {
                    Ok(Some(record)) => {
                        self.promote(key, &record, &missed);
                        return Ok(Some(record));
                    }
                    Ok(None) => {
                        clean_miss = true;
                        missed.push(backend);
                    }
                    Err(e) => {
                        warn!(key = %key, tier = %tier, error = %e, "cache tier read failed");
                        last_err = Some(e);
                    }
                }
            }
        }

        if clean_miss {
            return Ok(None);
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    fn write(
        &self,
        key: &BlobKey,
        record: &BlobRecord,
        tiers: &TierSet,
    ) -> StoreResult<WriteReport> {
        let mut report = WriteReport {
            durable_replicas: self.durable.len() as u32,
            ..WriteReport::default()
        };

        if tiers.contains(CacheTier::Durable) {
            if self.durable.is_empty() {
                return Err(StoreError::NoDurableTier);
            }
            for replica in &self.durable {
                match replica.write(key, record) {
                    Ok(()) => report.durable_acks += 1,
                    Err(e) => {
                        warn!(key = %key, error = %e, "durable replica write failed");
                    }
                }
            }
            if report.durable_acks == 0 {
                return Err(StoreError::DurableWriteFailed {
                    replicas: report.durable_replicas,
                });
            }

            // Coherence: caches outside the write set must not keep
            // serving the pre-write record.
            for tier in [CacheTier::Local, CacheTier::Shared] {
                if !tiers.contains(tier) {
                    if let Some(backend) = self.cache_backend(tier) {
                        if let Err(e) = backend.evict(key) {
                            warn!(key = %key, tier = %tier, error = %e, "stale cache eviction failed");
                        }
                    }
                }
            }
        }

        for tier in [CacheTier::Local, CacheTier::Shared] {
            if !tiers.contains(tier) {
                continue;
            }
            if let Some(backend) = self.cache_backend(tier) {
                match backend.write(key, record) {
                    Ok(()) => report.cache_writes += 1,
                    Err(e) => {
                        report.cache_failures += 1;
                        warn!(key = %key, tier = %tier, error = %e, "cache tier write failed");
                    }
                }
            }
        }

        debug!(key = %key, tiers = %tiers, acks = report.durable_acks, "blob write");
        Ok(report)
    }

    fn evict(&self, key: &BlobKey, tiers: &TierSet) -> StoreResult<()> {
        let mut durable_err: Option<StoreError> = None;

        if tiers.contains(CacheTier::Durable) {
            for replica in &self.durable {
                if let Err(e) = replica.evict(key) {
                    warn!(key = %key, error = %e, "durable replica eviction failed");
                    durable_err = Some(e);
                }
            }
        }
        for tier in [CacheTier::Local, CacheTier::Shared] {
            if !tiers.contains(tier) {
                continue;
            }
            if let Some(backend) = self.cache_backend(tier) {
                if let Err(e) = backend.evict(key) {
                    warn!(key = %key, tier = %tier, error = %e, "cache tier eviction failed");
                }
            }
        }

        match durable_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for TieredStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredStore")
            .field("local", &self.local.is_some())
            .field("shared", &self.shared.is_some())
            .field("durable_replicas", &self.durable.len())
            .finish()
    }
}
