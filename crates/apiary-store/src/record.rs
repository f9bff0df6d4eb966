use serde::{Deserialize, Serialize};

use apiary_types::{Cell, CellAddressMapping, UserRecord};

use crate::error::{StoreError, StoreResult};

/// The kind of state held in a blob record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlobKind {
    /// A full [`Cell`] body.
    Cell,
    /// An address binding: the [`CellAddressMapping`] an alias resolves to.
    Mapping,
    /// A [`UserRecord`].
    User,
}

impl std::fmt::Display for BlobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cell => write!(f, "cell"),
            Self::Mapping => write!(f, "mapping"),
            Self::User => write!(f, "user"),
        }
    }
}

/// Record codec version written to durable storage.
const RECORD_VERSION: u16 = 1;

/// A stored record: kind tag, codec version, serialized payload.
///
/// The store never interprets `data`; the typed constructors and accessors
/// below are the only codec. Decoding checks the kind tag so a mapping
/// read as a cell fails loudly instead of misparsing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRecord {
    pub kind: BlobKind,
    pub version: u16,
    pub data: Vec<u8>,
}

impl BlobRecord {
    fn encode<T: Serialize>(kind: BlobKind, value: &T) -> StoreResult<Self> {
        let data =
            bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self {
            kind,
            version: RECORD_VERSION,
            data,
        })
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self, expected: BlobKind) -> StoreResult<T> {
        if self.kind != expected {
            return Err(StoreError::WrongKind {
                expected,
                actual: self.kind,
            });
        }
        bincode::deserialize(&self.data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn from_cell(cell: &Cell) -> StoreResult<Self> {
        Self::encode(BlobKind::Cell, cell)
    }

    pub fn to_cell(&self) -> StoreResult<Cell> {
        self.decode(BlobKind::Cell)
    }

    pub fn from_mapping(mapping: &CellAddressMapping) -> StoreResult<Self> {
        Self::encode(BlobKind::Mapping, mapping)
    }

    pub fn to_mapping(&self) -> StoreResult<CellAddressMapping> {
        self.decode(BlobKind::Mapping)
    }

    pub fn from_user(user: &UserRecord) -> StoreResult<Self> {
        Self::encode(BlobKind::User, user)
    }

    pub fn to_user(&self) -> StoreResult<UserRecord> {
        self.decode(BlobKind::User)
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
