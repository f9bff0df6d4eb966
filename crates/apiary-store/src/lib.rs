//! Tiered blob storage for the apiary cell platform.
//!
//! Cells, address bindings, and user records are stored as opaque blob
//! records across an ordered set of cache tiers. Reads fall through the
//! requested tiers fastest-first and promote hits backwards; writes that
//! include the durable tier are authoritative, while cache-tier writes are
//! best-effort and never fail a request.
//!
//! # Key Types
//!
//! - [`CacheTier`] / [`TierSet`] — the tier model and ordered tier selections
//! - [`BlobKey`] / [`BlobRecord`] — storage keys and typed record codecs
//! - [`TierBackend`] — contract one tier's backing store implements
//! - [`MemoryTier`] / [`DiskTier`] — the two backends
//! - [`BlobStore`] / [`TieredStore`] — the multi-tier store the rest of the
//!   platform talks to

pub mod backend;
pub mod disk;
pub mod error;
pub mod key;
pub mod memory;
pub mod record;
pub mod tier;
pub mod tiered;

pub use backend::TierBackend;
pub use disk::DiskTier;
pub use error::{StoreError, StoreResult};
pub use key::BlobKey;
pub use memory::MemoryTier;
pub use record::{BlobKind, BlobRecord};
pub use tier::{CacheTier, TierSet};
pub use tiered::{BlobStore, TieredStore, WriteReport};
