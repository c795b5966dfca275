// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! KernelConfig — the config surface table in §6. Loading this from a file
//! or environment is out of scope for the core (§1); callers build one and
//! pass it in.

use serde::{Deserialize, Serialize};

use crate::domain::constants::fib;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierTimeouts {
    pub reflex_ms: u64,
    pub micro_ms: u64,
    pub macro_ms: u64,
    pub meta_ms: u64,
}

impl Default for TierTimeouts {
    fn default() -> Self {
        Self {
            reflex_ms: 100,
            micro_ms: 2_000,
            macro_ms: 10_000,
            meta_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerCounts {
    pub reflex: usize,
    pub micro: usize,
    pub macro_: usize,
    pub meta: usize,
}

impl Default for WorkerCounts {
    fn default() -> Self {
        Self {
            reflex: fib::F5 as usize,
            micro: fib::F4 as usize,
            macro_: fib::F3 as usize,
            meta: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    pub fail_threshold: u32,
    pub reset_s: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            fail_threshold: 5,
            reset_s: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    pub alpha: f64,
    pub ewc_threshold: u32,
    pub flush_batch: u32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            alpha: crate::domain::constants::LEARNING_RATE,
            ewc_threshold: crate::domain::constants::EWC_THRESHOLD,
            flush_batch: crate::domain::constants::FLUSH_BATCH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LodConfig {
    pub hysteresis_ticks: u32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self { hysteresis_ticks: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub session_usd: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self { session_usd: 10.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    pub tier_soft_timeouts: TierTimeouts,
    pub worker_counts: WorkerCounts,
    pub queue_cap: usize,
    pub circuit_breaker: CircuitBreakerConfig,
    pub learning: LearningConfig,
    pub lod: LodConfig,
    pub budget: BudgetConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            tier_soft_timeouts: TierTimeouts::default(),
            worker_counts: WorkerCounts::default(),
            queue_cap: fib::F12 as usize,
            circuit_breaker: CircuitBreakerConfig::default(),
            learning: LearningConfig::default(),
            lod: LodConfig::default(),
            budget: BudgetConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_queue_cap_is_f12() {
        assert_eq!(KernelConfig::default().queue_cap, 144);
    }

    #[test]
    fn default_worker_counts_follow_fibonacci_cadence() {
        let wc = WorkerCounts::default();
        assert_eq!(wc.reflex, 5);
        assert_eq!(wc.micro, 3);
        assert_eq!(wc.macro_, 2);
        assert_eq!(wc.meta, 1);
    }
}
