use std::fmt;

use serde::{Deserialize, Serialize};

use apiary_types::{CellAddress, CellAddressMapping, GridKind, UserId};

/// Storage key for a blob record.
///
/// Three namespaces share the store: cell bodies keyed by their grid
/// position, address bindings keyed by grid plus alias, and user records
/// keyed by account. The canonical byte form is stable across versions;
/// it feeds both durable file addressing and transaction lock ordering.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BlobKey {
    /// The cell body at a grid position.
    Cell(CellAddressMapping),
    /// The binding from one address to its grid position.
    Address { grid: GridKind, address: CellAddress },
    /// A user's ownership record.
    User(UserId),
}

impl BlobKey {
    pub fn cell(mapping: CellAddressMapping) -> Self {
        Self::Cell(mapping)
    }

    pub fn address(grid: GridKind, address: CellAddress) -> Self {
        Self::Address { grid, address }
    }

    pub fn user(id: UserId) -> Self {
        Self::User(id)
    }

    /// Stable canonical encoding. Never changes shape for existing
    /// variants; durable file names are derived from it.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            Self::Cell(mapping) => format!(
                "cell:{}:{}:{}",
                mapping.grid.as_str(),
                mapping.coordinate.x,
                mapping.coordinate.y
            )
            .into_bytes(),
            Self::Address { grid, address } => {
                format!("addr:{}:{}", grid.as_str(), address.as_str()).into_bytes()
            }
            Self::User(id) => format!("user:{}", id.as_uuid()).into_bytes(),
        }
    }

    /// Hex digest used as the durable file name for this key.
    pub fn file_digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"apiary-blob-v1:");
        hasher.update(&self.canonical_bytes());
        hex::encode(hasher.finalize().as_bytes())
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(mapping) => write!(f, "cell {mapping}"),
            Self::Address { grid, address } => write!(f, "address {grid}:{address}"),
            Self::User(id) => write!(f, "user {id}"),
        }
    }
}
