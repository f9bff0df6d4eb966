use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mapping::CellAddressMapping;

/// Identifier for a platform account (UUID v7 for time-ordering).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(uuid::Uuid);

impl UserId {
    /// Generate a new time-ordered user ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Create a random (non-time-ordered) ID for tests and demos.
    pub fn ephemeral() -> Self {
        let mut bytes = [0u8; 16];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(uuid::Uuid::from_bytes(bytes))
    }

    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of the UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.short_id())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persistent record of the cells an account owns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub owned: Vec<CellAddressMapping>,
}

impl UserRecord {
    pub fn new(id: UserId) -> Self {
        Self { id, owned: Vec::new() }
    }

    /// Attach a cell to this account. Attaching twice is a no-op.
    pub fn attach(&mut self, mapping: CellAddressMapping) -> bool {
        if self.owned.contains(&mapping) {
            return false;
        }
        self.owned.push(mapping);
        true
    }

    pub fn owns(&self, mapping: &CellAddressMapping) -> bool {
        self.owned.contains(mapping)
    }
}
