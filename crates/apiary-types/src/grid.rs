use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Named grid a cell lives in.
///
/// Grids are independent coordinate namespaces: the same `(x, y)` pair in
/// two different grids refers to two different cells, and an address bound
/// in one grid says nothing about the others.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    /// The live grid users interact with.
    Active,
    /// Pre-publication staging grid.
    Staging,
    /// Retired content kept addressable.
    Archive,
}

impl GridKind {
    /// Canonical lowercase name, stable across versions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Staging => "staging",
            Self::Archive => "archive",
        }
    }

    /// All grid kinds in declaration order.
    pub fn all() -> [GridKind; 3] {
        [Self::Active, Self::Staging, Self::Archive]
    }
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GridKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "staging" => Ok(Self::Staging),
            "archive" => Ok(Self::Archive),
            other => Err(TypeError::UnknownGridKind(other.to_string())),
        }
    }
}

/// Position of a cell within a grid.
///
/// Coordinates are plain signed pairs; the platform attaches no meaning to
/// them beyond identity. Ordering is row-major (`y` first, then `x`) so
/// that iterating a sorted set walks the grid a row at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoordinate {
    pub x: i64,
    pub y: i64,
}

impl GridCoordinate {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl PartialOrd for GridCoordinate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GridCoordinate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl fmt::Display for GridCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}
