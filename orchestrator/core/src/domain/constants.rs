// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Golden-ratio derived constants shared by the consensus aggregator,
//! the Q-learning loop and the residual detector. Every bound in this
//! module is enforced at its write site, never assumed by a caller.

/// φ, the golden ratio.
pub const PHI: f64 = 1.618_033_988_749_895;

/// φ⁻¹ — the hard ceiling on any `confidence` value.
pub const MAX_CONFIDENCE: f64 = 0.618;

/// φ⁻² — used as the residual "rising" span and the SPIKE baseline.
pub const PHI_INV2: f64 = 0.382;

/// Verdict thresholds, in ascending order. `q_score` below `BARK_MAX` is
/// BARK, below `GROWL_MAX` is GROWL, below `WAG_MAX` is WAG, else HOWL.
pub const BARK_MAX: f64 = 38.2;
pub const GROWL_MAX: f64 = 61.8;
pub const WAG_MAX: f64 = 82.0;

/// Base learning rate for the Q-table TD(0) update.
pub const LEARNING_RATE: f64 = 0.038;

/// EWC consolidation damping factor (λ).
pub const EWC_LAMBDA: f64 = 0.618;

/// Visit count at which a `QEntry` latches into "consolidated".
pub const EWC_THRESHOLD: u32 = 21;

/// Batch size for flushing dirty Q-table entries.
pub const FLUSH_BATCH: u32 = 21;

/// Size of the residual detector's ring buffer.
pub const RESIDUAL_WINDOW: usize = 21;

/// Rolling cap on the action proposer's pending queue.
pub const ACTION_QUEUE_CAP: usize = 89;

/// Fibonacci numbers used throughout for cadences, worker pool sizes and
/// queue caps. Named after F(k) in the specification.
pub mod fib {
    pub const F3: u64 = 2;
    pub const F4: u64 = 3;
    pub const F5: u64 = 5;
    pub const F7: u64 = 13;
    pub const F8: u64 = 21;
    pub const F9: u64 = 34;
    pub const F10: u64 = 55;
    pub const F11: u64 = 89;
    pub const F12: u64 = 144;
}

/// Clamp `confidence` into `[0, MAX_CONFIDENCE]`, logging when the input
/// would have exceeded the bound.
pub fn clamp_confidence(value: f64) -> f64 {
    if !(0.0..=MAX_CONFIDENCE).contains(&value) {
        tracing::debug!(value, "confidence clamped to phi bound");
    }
    value.clamp(0.0, MAX_CONFIDENCE)
}

/// Clamp `q_score` into `[0, 100]`.
pub fn clamp_q_score(value: f64) -> f64 {
    if !(0.0..=100.0).contains(&value) {
        tracing::debug!(value, "q_score clamped to [0, 100]");
    }
    value.clamp(0.0, 100.0)
}

/// Clamp a unit-interval quantity (risk, complexity, residual_variance) into `[0, 1]`.
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
