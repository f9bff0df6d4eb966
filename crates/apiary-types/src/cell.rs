use serde::{Deserialize, Serialize};

use crate::address::CellAddress;
use crate::code::{CellCode, CompilationStatus};
use crate::mapping::CellAddressMapping;
use crate::privileges::CodePrivileges;

/// The stored unit of the platform: one position in a grid, its alias set,
/// its privileges, and whatever content has been published there.
///
/// Cells are created by a transaction and never deleted; republishing
/// replaces content, and unbinding addresses leaves the cell in place.
/// `version` counts persisted mutations and is assigned by whoever writes
/// the cell, never by the cell itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub mapping: CellAddressMapping,
    /// Every address currently bound to this cell, primary first.
    pub addresses: Vec<CellAddress>,
    pub privileges: CodePrivileges,
    pub source: Option<CellCode>,
    pub compiled: Option<CellCode>,
    /// Outcome of the most recent compilation attempt.
    pub status: CompilationStatus,
    pub version: u64,
}

impl Cell {
    pub fn new(
        mapping: CellAddressMapping,
        addresses: Vec<CellAddress>,
        privileges: CodePrivileges,
    ) -> Self {
        Self {
            mapping,
            addresses,
            privileges,
            source: None,
            compiled: None,
            status: CompilationStatus::NoError,
            version: 0,
        }
    }

    /// The address users reach this cell by first, if any are bound.
    pub fn primary_address(&self) -> Option<&CellAddress> {
        self.addresses.first()
    }

    pub fn has_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// Install a successful compilation: source and compiled content move
    /// together, and the status clears.
    pub fn apply_compile(&mut self, source: impl Into<String>, compiled: impl Into<String>) {
        self.source = Some(CellCode::source(source));
        self.compiled = Some(CellCode::compiled(compiled));
        self.status = CompilationStatus::NoError;
    }

    /// Record a failed compilation without touching published content.
    pub fn record_failure(&mut self, status: CompilationStatus) {
        self.status = status;
    }

    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}
