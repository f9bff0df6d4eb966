use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{GridCoordinate, GridKind};

/// The coordinate an address resolves to: a grid plus a position in it.
///
/// Mappings are what transactions and the store key cells by. Many
/// addresses may map to one `CellAddressMapping`; each address maps to at
/// most one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddressMapping {
    pub grid: GridKind,
    pub coordinate: GridCoordinate,
}

impl CellAddressMapping {
    pub fn new(grid: GridKind, coordinate: GridCoordinate) -> Self {
        Self { grid, coordinate }
    }

    pub fn at(grid: GridKind, x: i64, y: i64) -> Self {
        Self::new(grid, GridCoordinate::new(x, y))
    }
}

impl fmt::Display for CellAddressMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.grid, self.coordinate)
    }
}
