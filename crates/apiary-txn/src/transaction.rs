use std::fmt;

use serde::{Deserialize, Serialize};

use apiary_store::BlobKey;
use apiary_types::{CellAddress, CellAddressMapping, CodePrivileges, UserId};

/// The kinds of transaction the platform supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnKind {
    CreateCell,
    RebindAddresses,
    SetPrivileges,
    AttachCellToUser,
}

impl fmt::Display for TxnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateCell => f.write_str("create-cell"),
            Self::RebindAddresses => f.write_str("rebind-addresses"),
            Self::SetPrivileges => f.write_str("set-privileges"),
            Self::AttachCellToUser => f.write_str("attach-cell-to-user"),
        }
    }
}

/// One atomic mutation of the cell space.
///
/// A transaction names every blob it will touch up front except for the
/// bindings a rebind removes, which the engine discovers from the cell
/// record under lock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlobTransaction {
    /// Create a cell at an unoccupied coordinate and bind its addresses.
    CreateCell {
        mapping: CellAddressMapping,
        addresses: Vec<CellAddress>,
        privileges: CodePrivileges,
    },
    /// Replace a cell's alias set: bind the given addresses, unbind any
    /// the cell currently holds that are absent from the list.
    RebindAddresses {
        mapping: CellAddressMapping,
        addresses: Vec<CellAddress>,
    },
    /// Replace a cell's privilege set.
    SetPrivileges {
        mapping: CellAddressMapping,
        privileges: CodePrivileges,
    },
    /// Record a cell in a user's ownership list.
    AttachCellToUser {
        user: UserId,
        mapping: CellAddressMapping,
    },
}

impl BlobTransaction {
    pub fn kind(&self) -> TxnKind {
        match self {
            Self::CreateCell { .. } => TxnKind::CreateCell,
            Self::RebindAddresses { .. } => TxnKind::RebindAddresses,
            Self::SetPrivileges { .. } => TxnKind::SetPrivileges,
            Self::AttachCellToUser { .. } => TxnKind::AttachCellToUser,
        }
    }

    /// The mapping this transaction operates on.
    pub fn mapping(&self) -> CellAddressMapping {
        match self {
            Self::CreateCell { mapping, .. }
            | Self::RebindAddresses { mapping, .. }
            | Self::SetPrivileges { mapping, .. }
            | Self::AttachCellToUser { mapping, .. } => *mapping,
        }
    }

    /// The statically known lock set, sorted and deduplicated.
    ///
    /// Lock acquisition walks this order everywhere, which rules out
    /// lock-order cycles between transactions.
    pub fn lock_keys(&self) -> Vec<BlobKey> {
        let mut keys = match self {
            Self::CreateCell {
                mapping, addresses, ..
            }
            | Self::RebindAddresses { mapping, addresses } => {
                let mut keys = vec![BlobKey::cell(*mapping)];
                keys.extend(
                    addresses
                        .iter()
                        .map(|address| BlobKey::address(mapping.grid, address.clone())),
                );
                keys
            }
            Self::SetPrivileges { mapping, .. } => vec![BlobKey::cell(*mapping)],
            Self::AttachCellToUser { user, mapping } => {
                vec![BlobKey::cell(*mapping), BlobKey::user(*user)]
            }
        };
        keys.sort();
        keys.dedup();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiary_types::GridKind;

    fn mapping() -> CellAddressMapping {
        CellAddressMapping::at(GridKind::Active, 1, 2)
    }

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn lock_keys_cover_cell_and_addresses() {
        let txn = BlobTransaction::CreateCell {
            mapping: mapping(),
            addresses: vec![addr("Book/Page100"), addr("Book")],
            privileges: CodePrivileges::open(),
        };
        let keys = txn.lock_keys();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&BlobKey::cell(mapping())));
        assert!(keys.contains(&BlobKey::address(GridKind::Active, addr("Book"))));
    }

    #[test]
    fn lock_keys_are_sorted_and_deduplicated() {
        let txn = BlobTransaction::RebindAddresses {
            mapping: mapping(),
            addresses: vec![addr("B"), addr("A"), addr("B")],
        };
        let keys = txn.lock_keys();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn kind_matches_variant() {
        let txn = BlobTransaction::SetPrivileges {
            mapping: mapping(),
            privileges: CodePrivileges::default(),
        };
        assert_eq!(txn.kind(), TxnKind::SetPrivileges);
        assert_eq!(txn.kind().to_string(), "set-privileges");
    }
}
