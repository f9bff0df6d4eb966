//! Foundation types for the apiary cell platform.
//!
//! This crate provides the coordinate, address, and cell types used
//! throughout the system. Every other apiary crate depends on
//! `apiary-types`.
//!
//! # Key Types
//!
//! - [`GridCoordinate`] — Position of a cell within a named grid
//! - [`CellAddress`] — Validated human-readable alias for a coordinate
//! - [`CellAddressMapping`] — Grid-qualified coordinate an address binds to
//! - [`Cell`] — The stored unit: source, compiled content, privileges
//! - [`CodePrivileges`] — Network access tier and character quota for a cell
//! - [`CompilationStatus`] — Closed outcome set of the compilation gate
//! - [`CancelToken`] — Cooperative cancellation handle for long requests

pub mod address;
pub mod cancel;
pub mod cell;
pub mod code;
pub mod error;
pub mod grid;
pub mod mapping;
pub mod privileges;
pub mod user;

pub use address::CellAddress;
pub use cancel::CancelToken;
pub use cell::Cell;
pub use code::{CellCode, CodeKind, CompilationStatus};
pub use error::TypeError;
pub use grid::{GridCoordinate, GridKind};
pub use mapping::CellAddressMapping;
pub use privileges::{CharacterQuota, CodePrivileges, NetworkPrivilege};
pub use user::{UserId, UserRecord};
