//! Pair identity

use serde::{Deserialize, Serialize};

/// A pair of perpetual instruments. Identity is the unordered pair of
/// symbols; the stored order is the discovery direction (leg 1 is the
/// instrument the position direction refers to).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairSymbol {
    pub leg1: String,
    pub leg2: String,
}

impl PairSymbol {
    pub fn new(leg1: impl Into<String>, leg2: impl Into<String>) -> Self {
        Self {
            leg1: leg1.into(),
            leg2: leg2.into(),
        }
    }

    /// Canonical unordered key, used for all keyed storage so `A/B` and
    /// `B/A` collapse to one identity.
    pub fn key(&self) -> String {
        if self.leg1 <= self.leg2 {
            format!("{}-{}", self.leg1, self.leg2)
        } else {
            format!("{}-{}", self.leg2, self.leg1)
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.leg1 == symbol || self.leg2 == symbol
    }
}

impl std::fmt::Display for PairSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.leg1, self.leg2)
    }
}
