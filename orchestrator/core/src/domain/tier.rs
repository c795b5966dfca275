// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tier and system-wide LOD (level of detail / self-throttle) enums.

use serde::{Deserialize, Serialize};

/// Cognitive depth at which a pipeline runs. Ordered REFLEX < MICRO < MACRO < META
/// so callers can compare tiers with `<`/`>` when applying caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Reflex,
    Micro,
    Macro,
    Meta,
}

impl Tier {
    pub fn soft_timeout_ms(&self) -> u64 {
        match self {
            Tier::Reflex => 100,
            Tier::Micro => 2_000,
            Tier::Macro => 10_000,
            Tier::Meta => 30_000,
        }
    }

    /// Target wall-clock latency used by the scheduler to size worker pools;
    /// distinct from the hard `soft_timeout_ms` cancellation bound.
    pub fn target_latency_ms(&self) -> u64 {
        match self {
            Tier::Reflex => 10,
            Tier::Micro => 500,
            Tier::Macro => 3_000,
            Tier::Meta => 30_000,
        }
    }

    pub fn worker_count(&self) -> usize {
        match self {
            Tier::Reflex => 5,
            Tier::Micro => 3,
            Tier::Macro => 2,
            Tier::Meta => 1,
        }
    }

    /// Budget fraction of the Cell's total `budget_usd` handed to a single
    /// judge at this tier (§4.7).
    pub fn per_judge_budget_fraction(&self) -> f64 {
        match self {
            Tier::Reflex => 0.0, // REFLEX runs non-LLM judges only; no spend.
            Tier::Micro => 0.382,
            Tier::Macro => 1.0,
            Tier::Meta => 0.0,
        }
    }

    pub fn confidence_cap(&self) -> f64 {
        match self {
            Tier::Reflex => crate::domain::constants::PHI_INV2,
            Tier::Micro | Tier::Macro => crate::domain::constants::MAX_CONFIDENCE,
            Tier::Meta => crate::domain::constants::MAX_CONFIDENCE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Reflex => "reflex",
            Tier::Micro => "micro",
            Tier::Macro => "macro",
            Tier::Meta => "meta",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kernel self-throttle level, computed from health metrics by the LOD
/// controller (§4.8). Ordered best-to-worst so `max` picks the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemLod {
    Full,
    Reduced,
    Emergency,
    Minimal,
}

impl SystemLod {
    /// The highest tier permitted at this LOD, used to cap tier selection.
    pub fn tier_cap(&self) -> Tier {
        match self {
            SystemLod::Full => Tier::Meta,
            SystemLod::Reduced => Tier::Micro,
            SystemLod::Emergency => Tier::Reflex,
            SystemLod::Minimal => Tier::Reflex,
        }
    }

    /// Apply this LOD's cap to a requested tier. Idempotent: capping an
    /// already-capped tier is a no-op (property 6, §8).
    pub fn cap(&self, requested: Tier) -> Tier {
        requested.min(self.tier_cap())
    }
}

impl std::fmt::Display for SystemLod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SystemLod::Full => "full",
            SystemLod::Reduced => "reduced",
            SystemLod::Emergency => "emergency",
            SystemLod::Minimal => "minimal",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_is_idempotent() {
        let lod = SystemLod::Reduced;
        let once = lod.cap(Tier::Macro);
        let twice = lod.cap(once);
        assert_eq!(once, twice);
        assert_eq!(once, Tier::Micro);
    }

    #[test]
    fn tier_ordering_matches_cost_progression() {
        assert!(Tier::Reflex < Tier::Micro);
        assert!(Tier::Micro < Tier::Macro);
        assert!(Tier::Macro < Tier::Meta);
    }
}
