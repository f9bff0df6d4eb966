use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// How many durable replicas must acknowledge each blob write.
///
/// Single-replica deployments use [`Quorum::ONE`]; replicated ones pass a
/// higher value through the same `perform` signature. A quorum is never
/// zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quorum(NonZeroU32);

impl Quorum {
    /// The single-replica default.
    pub const ONE: Quorum = Quorum(NonZeroU32::MIN);

    /// Build a quorum; `None` when `required` is zero.
    pub fn new(required: u32) -> Option<Self> {
        NonZeroU32::new(required).map(Self)
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl Default for Quorum {
    fn default() -> Self {
        Self::ONE
    }
}

impl From<NonZeroU32> for Quorum {
    fn from(value: NonZeroU32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Quorum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_a_quorum() {
        assert!(Quorum::new(0).is_none());
        assert_eq!(Quorum::new(1), Some(Quorum::ONE));
    }

    #[test]
    fn default_is_one() {
        assert_eq!(Quorum::default().get(), 1);
    }
}
