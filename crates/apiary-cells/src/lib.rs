//! Cell lifecycle orchestration for the apiary platform.
//!
//! This crate sequences the lower layers into the platform's one entry
//! point: publish content at an address, creating the cell if it does not
//! exist yet. [`CellLifecycle`] resolves the address, runs the
//! create-or-rebind transaction, pushes the source through the compilation
//! gate, and saves the compiled cell back across tiers. [`Seeder`] drives
//! that pipeline over a configured set of volumes, one cell at a time,
//! continuing past per-cell failures. [`PlatformContext`] wires the store,
//! transaction engine, and compiler together from a [`PlatformConfig`] and
//! is threaded explicitly into everything; there is no process-wide state.

pub mod context;
pub mod directory;
pub mod error;
pub mod lifecycle;
pub mod seed;

pub use context::{PlatformConfig, PlatformContext};
pub use directory::AddressDirectory;
pub use error::{ContextError, PublishError, PublishResult};
pub use lifecycle::{CellLifecycle, PublishReceipt, PublishRequest};
pub use seed::{SeedFailure, SeedReport, SeedVolume, Seeder};
