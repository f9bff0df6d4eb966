use std::fmt;

use serde::{Deserialize, Serialize};

/// A durability/speed tier a blob can live in.
///
/// Tiers are ordered fastest-first: [`CacheTier::Local`] is a per-process
/// cache, [`CacheTier::Shared`] a cross-process cache, and
/// [`CacheTier::Durable`] the persistent backing store that is always
/// authoritative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    Local,
    Shared,
    Durable,
}

impl CacheTier {
    /// Position in the fall-through order (0 is fastest).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Local => 0,
            Self::Shared => 1,
            Self::Durable => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Shared => "shared",
            Self::Durable => "durable",
        }
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Durable)
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, deduplicated selection of tiers for one read or write.
///
/// Order matters on the read path: tiers are consulted in the order they
/// appear. The named constructors cover the selections the platform
/// actually uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierSet {
    tiers: Vec<CacheTier>,
}

impl TierSet {
    /// Build a set from tiers in consultation order. Duplicates keep their
    /// first position.
    pub fn new(tiers: impl IntoIterator<Item = CacheTier>) -> Self {
        let mut seen = Vec::new();
        for tier in tiers {
            if !seen.contains(&tier) {
                seen.push(tier);
            }
        }
        Self { tiers: seen }
    }

    /// Just the durable tier: authoritative reads and transaction writes.
    pub fn durable_only() -> Self {
        Self::new([CacheTier::Durable])
    }

    /// Full fall-through read: local, then shared, then durable.
    pub fn read_path() -> Self {
        Self::new([CacheTier::Local, CacheTier::Shared, CacheTier::Durable])
    }

    /// Read path used when fetching a cell for compilation: local then
    /// durable, skipping the shared cache.
    pub fn compile_path() -> Self {
        Self::new([CacheTier::Local, CacheTier::Durable])
    }

    /// Write set for publishing compiled content everywhere at once.
    pub fn publish_path() -> Self {
        Self::new([CacheTier::Local, CacheTier::Shared, CacheTier::Durable])
    }

    pub fn contains(&self, tier: CacheTier) -> bool {
        self.tiers.contains(&tier)
    }

    pub fn iter(&self) -> impl Iterator<Item = CacheTier> + '_ {
        self.tiers.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl fmt::Display for TierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tier in &self.tiers {
            if !first {
                f.write_str("+")?;
            }
            write!(f, "{tier}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered_fastest_first() {
        assert!(CacheTier::Local.rank() < CacheTier::Shared.rank());
        assert!(CacheTier::Shared.rank() < CacheTier::Durable.rank());
    }

    #[test]
    fn set_preserves_order_and_dedupes() {
        let set = TierSet::new([
            CacheTier::Durable,
            CacheTier::Local,
            CacheTier::Durable,
        ]);
        let tiers: Vec<CacheTier> = set.iter().collect();
        assert_eq!(tiers, vec![CacheTier::Durable, CacheTier::Local]);
    }

    #[test]
    fn read_path_ends_at_durable() {
        let tiers: Vec<CacheTier> = TierSet::read_path().iter().collect();
        assert_eq!(
            tiers,
            vec![CacheTier::Local, CacheTier::Shared, CacheTier::Durable]
        );
    }

    #[test]
    fn compile_path_skips_shared() {
        assert!(!TierSet::compile_path().contains(CacheTier::Shared));
        assert!(TierSet::compile_path().contains(CacheTier::Durable));
    }

    #[test]
    fn display_joins_with_plus() {
        assert_eq!(TierSet::read_path().to_string(), "local+shared+durable");
    }
}
