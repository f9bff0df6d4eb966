use std::fmt;

use serde::{Deserialize, Serialize};

/// Network access a cell's code is permitted.
///
/// Checked at compilation time, not at runtime: source that references
/// endpoints outside its tier fails the gate with a policy violation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkPrivilege {
    /// No external references at all.
    #[default]
    None,
    /// Secure (`https`) references only.
    Restricted,
    /// Any external reference.
    All,
}

impl fmt::Display for NetworkPrivilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Restricted => f.write_str("restricted"),
            Self::All => f.write_str("all"),
        }
    }
}

/// Size budget for a cell's source, in characters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterQuota {
    #[default]
    Tier1,
    Tier2,
    Tier3,
}

impl CharacterQuota {
    /// Maximum number of characters the tier admits.
    pub fn max_chars(&self) -> usize {
        match self {
            Self::Tier1 => 16_384,
            Self::Tier2 => 65_536,
            Self::Tier3 => 262_144,
        }
    }
}

impl fmt::Display for CharacterQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tier1 => f.write_str("tier1"),
            Self::Tier2 => f.write_str("tier2"),
            Self::Tier3 => f.write_str("tier3"),
        }
    }
}

/// The privilege set attached to a cell.
///
/// Privileges are fixed when the cell is created and change only through
/// an explicit privilege transaction; the compilation gate reads them but
/// never writes them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodePrivileges {
    pub network: NetworkPrivilege,
    pub quota: CharacterQuota,
}

impl CodePrivileges {
    pub fn new(network: NetworkPrivilege, quota: CharacterQuota) -> Self {
        Self { network, quota }
    }

    /// The widest privilege set the platform grants.
    pub fn open() -> Self {
        Self::new(NetworkPrivilege::All, CharacterQuota::Tier1)
    }
}

impl fmt::Display for CodePrivileges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network={} quota={}", self.network, self.quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_tiers_are_ordered_by_size() {
        assert!(CharacterQuota::Tier1.max_chars() < CharacterQuota::Tier2.max_chars());
        assert!(CharacterQuota::Tier2.max_chars() < CharacterQuota::Tier3.max_chars());
    }

    #[test]
    fn default_privileges_are_closed() {
        let privileges = CodePrivileges::default();
        assert_eq!(privileges.network, NetworkPrivilege::None);
        assert_eq!(privileges.quota, CharacterQuota::Tier1);
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&NetworkPrivilege::Restricted).unwrap();
        assert_eq!(json, "\"restricted\"");
    }
}
