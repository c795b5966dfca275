// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! ProposedAction — one actionable verdict awaiting operator approval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cell::Reality;
use crate::domain::judgment::{JudgmentId, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Investigate,
    Refactor,
    Alert,
    Monitor,
    Improve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Accepted,
    Rejected,
    AutoExecuted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedAction {
    pub action_id: ActionId,
    pub judgment_id: JudgmentId,
    pub state_key: String,
    pub verdict: Verdict,
    pub reality: Reality,
    pub action_type: ActionType,
    /// 1 (most urgent) through 4.
    pub priority: u8,
    pub prompt: String,
    pub status: ActionStatus,
    pub proposed_at: DateTime<Utc>,
}

impl ProposedAction {
    pub fn new(
        judgment_id: JudgmentId,
        state_key: impl Into<String>,
        verdict: Verdict,
        reality: Reality,
        action_type: ActionType,
        priority: u8,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            action_id: ActionId::new(),
            judgment_id,
            state_key: state_key.into(),
            verdict,
            reality,
            action_type,
            priority: priority.clamp(1, 4),
            prompt: prompt.into(),
            status: ActionStatus::Pending,
            proposed_at: Utc::now(),
        }
    }
}

/// Maps `(verdict, reality)` to `(action_type, priority)` via the fixed
/// table in §4.13. Returns `None` for combinations the table does not cover;
/// the caller then leaves the Judgment un-actioned.
pub fn classify(verdict: Verdict, reality: Reality) -> Option<(ActionType, u8)> {
    use Reality::*;
    use Verdict::*;
    match (verdict, reality) {
        (Bark, Code) | (Bark, Cynic) => Some((ActionType::Investigate, 1)),
        (Bark, Market) | (Bark, Solana) | (Bark, Social) => Some((ActionType::Alert, 2)),
        (Growl, Code) | (Growl, Cynic) => Some((ActionType::Refactor, 2)),
        (Growl, Market) | (Growl, Social) => Some((ActionType::Monitor, 3)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_the_documented_table() {
        assert_eq!(classify(Verdict::Bark, Reality::Code), Some((ActionType::Investigate, 1)));
        assert_eq!(classify(Verdict::Bark, Reality::Market), Some((ActionType::Alert, 2)));
        assert_eq!(classify(Verdict::Growl, Reality::Cynic), Some((ActionType::Refactor, 2)));
        assert_eq!(classify(Verdict::Growl, Reality::Social), Some((ActionType::Monitor, 3)));
        assert_eq!(classify(Verdict::Wag, Reality::Code), None);
    }
}
