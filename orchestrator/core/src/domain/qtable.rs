// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! QEntry — a single learned value in the Q-table, keyed by `(state_key, action)`.

use serde::{Deserialize, Serialize};

use crate::domain::constants::{clamp_unit, EWC_LAMBDA, EWC_THRESHOLD, LEARNING_RATE};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QKey {
    pub state_key: String,
    pub action: String,
}

impl QKey {
    pub fn new(state_key: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            state_key: state_key.into(),
            action: action.into(),
        }
    }
}

/// A learned value for one `(state_key, action)` pair.
///
/// `consolidated` is a one-way latch: once `visits` crosses
/// [`EWC_THRESHOLD`] it never resets, and every subsequent update uses the
/// damped effective learning rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QEntry {
    pub q_value: f64,
    pub visits: u32,
    pub wins: u32,
    pub losses: u32,
    pub ewc_anchor: Option<f64>,
    pub consolidated: bool,
    pub dirty: bool,
}

impl Default for QEntry {
    fn default() -> Self {
        Self {
            q_value: 0.0,
            visits: 0,
            wins: 0,
            losses: 0,
            ewc_anchor: None,
            consolidated: false,
            dirty: false,
        }
    }
}

/// Outcome of applying one TD(0) update, reported so the learning loop can
/// decide whether to emit `EWC_CHECKPOINT`.
pub struct UpdateOutcome {
    pub just_consolidated: bool,
}

impl QEntry {
    fn effective_alpha(&self, alpha: f64) -> f64 {
        if self.consolidated {
            alpha * (1.0 - EWC_LAMBDA)
        } else {
            alpha
        }
    }

    /// Apply the TD(0) update rule with the default `alpha`/`ewc_threshold`
    /// from [`crate::domain::constants`]. See [`QEntry::apply_reward_with`]
    /// for the config-overridable form the learning loop actually uses.
    pub fn apply_reward(&mut self, reward: f64) -> UpdateOutcome {
        self.apply_reward_with(reward, LEARNING_RATE, EWC_THRESHOLD)
    }

    /// Apply the TD(0) update rule:
    /// `q_new = (1 - alpha_eff) * q_old + alpha_eff * r`, where `alpha` and
    /// `ewc_threshold` come from [`crate::domain::config::LearningConfig`]
    /// (§6 config surface: `learning.alpha` / `.ewc_threshold`).
    pub fn apply_reward_with(&mut self, reward: f64, alpha: f64, ewc_threshold: u32) -> UpdateOutcome {
        let reward = clamp_unit(reward);
        let alpha_eff = self.effective_alpha(alpha);
        self.q_value = (1.0 - alpha_eff) * self.q_value + alpha_eff * reward;
        self.visits += 1;
        self.dirty = true;
        if reward >= 0.5 {
            self.wins += 1;
        } else {
            self.losses += 1;
        }

        let just_consolidated = !self.consolidated && self.visits >= ewc_threshold;
        if just_consolidated {
            self.consolidated = true;
            self.ewc_anchor = Some(self.q_value);
        }
        UpdateOutcome { just_consolidated }
    }

    /// `min(log(1 + visits) / log(1 + ewc_threshold), MAX_CONFIDENCE)`.
    pub fn confidence_with(&self, ewc_threshold: u32) -> f64 {
        let raw = ((1.0 + self.visits as f64).ln()) / ((1.0 + ewc_threshold as f64).ln());
        raw.min(crate::domain::constants::MAX_CONFIDENCE)
    }

    /// [`QEntry::confidence_with`] against the default `ewc_threshold`.
    pub fn confidence(&self) -> f64 {
        self.confidence_with(EWC_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consolidation_latches_one_way() {
        let mut entry = QEntry::default();
        for _ in 0..20 {
            entry.apply_reward(0.9);
        }
        assert!(!entry.consolidated);

        let outcome = entry.apply_reward(0.9);
        assert!(entry.consolidated);
        assert!(outcome.just_consolidated);

        // A later low-reward update must not un-consolidate.
        let outcome2 = entry.apply_reward(0.0);
        assert!(entry.consolidated);
        assert!(!outcome2.just_consolidated);
    }

    #[test]
    fn post_consolidation_updates_move_less() {
        let mut a = QEntry::default();
        for _ in 0..21 {
            a.apply_reward(0.9);
        }
        let pre = a.q_value;
        a.apply_reward(0.9);
        let post_consolidated_delta = (a.q_value - pre).abs();

        let mut b = QEntry::default();
        for _ in 0..4 {
            b.apply_reward(0.9);
        }
        let pre_b = b.q_value;
        b.apply_reward(0.9);
        let pre_consolidation_delta = (b.q_value - pre_b).abs();

        assert!(post_consolidated_delta < pre_consolidation_delta);
    }

    #[test]
    fn confidence_caps_at_phi_inverse() {
        let mut entry = QEntry::default();
        for _ in 0..1000 {
            entry.apply_reward(1.0);
        }
        assert!(entry.confidence() <= crate::domain::constants::MAX_CONFIDENCE);
    }
}
