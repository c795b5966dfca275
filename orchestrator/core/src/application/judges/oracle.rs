// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! ORACLE — the predictor judge. Reads the Q-table read-only and votes
//! its learned `q_value` for the Cell's `state_key`; it never writes back
//! (§9 "Judges as polymorphic uniform contract"). Its confidence doubles
//! as the `oracle_confidence` input to the tier orchestrator's blended
//! tier-selection signal (§4.7).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::learning::LearningLoop;
use crate::domain::cell::{Cell, Reality};
use crate::domain::judge::{Judge, JudgeCapabilities, JudgeError, JudgeHealth};
use crate::domain::tier::Tier;
use crate::domain::vote::DogVote;

pub struct OracleDog {
    learning: Arc<LearningLoop>,
}

impl OracleDog {
    pub fn new(learning: Arc<LearningLoop>) -> Self {
        Self { learning }
    }

    /// The confidence this judge would bring to a tier-selection decision
    /// for `state_key`, independent of running a full `analyze`.
    pub fn oracle_confidence(&self, state_key: &str) -> f64 {
        let (_, _, confidence) = self.learning.best_known(state_key);
        confidence
    }
}

#[async_trait]
impl Judge for OracleDog {
    fn judge_id(&self) -> &str {
        "oracle"
    }

    async fn analyze(
        &self,
        cell: &Cell,
        _budget_usd: f64,
        _context_hints: &[String],
    ) -> Result<DogVote, JudgeError> {
        let state_key = cell.state_key();
        let (action, q_value, confidence) = self.learning.best_known(&state_key);
        let q_score = q_value * 100.0;
        Ok(DogVote::new(self.judge_id().into(), cell.cell_id, q_score, confidence)
            .with_reasoning(format!("q-table favors '{action}' with q_value={q_value:.3}")))
    }

    async fn health(&self) -> JudgeHealth {
        JudgeHealth::Healthy
    }

    fn capabilities(&self) -> JudgeCapabilities {
        JudgeCapabilities {
            min_tier: Tier::Micro,
            uses_llm: false,
            supported_realities: HashSet::from([
                Reality::Code,
                Reality::Market,
                Reality::Social,
                Reality::Human,
                Reality::Cynic,
                Reality::Solana,
                Reality::Cosmos,
            ]),
            reputation: 60.0,
            is_coordinator: false,
            is_guardian: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::{Analysis, CellBuilder};
    use crate::infrastructure::memory::InMemoryStorage;

    #[tokio::test]
    async fn unseen_state_defaults_to_cautious_growl() {
        let learning = LearningLoop::new(InMemoryStorage::new_storage(), crate::infrastructure::event_bus::EventBus::with_default_capacity());
        let oracle = OracleDog::new(learning);
        let cell = CellBuilder::new(Reality::Code, Analysis::Judge).build();
        let vote = oracle.analyze(&cell, 1.0, &[]).await.unwrap();
        assert!(vote.reasoning.contains("growl"));
    }

    #[tokio::test]
    async fn learned_state_is_reflected_without_mutating_the_table() {
        let learning = LearningLoop::new(InMemoryStorage::new_storage(), crate::infrastructure::event_bus::EventBus::with_default_capacity());
        let cell = CellBuilder::new(Reality::Code, Analysis::Judge).build();
        let state_key = cell.state_key();
        for _ in 0..5 {
            learning.apply(&state_key, "wag", 0.9, None).await;
        }

        let oracle = OracleDog::new(learning.clone());
        let before = learning.q_value_for(&state_key, "wag");
        let vote = oracle.analyze(&cell, 1.0, &[]).await.unwrap();
        let after = learning.q_value_for(&state_key, "wag");

        assert_eq!(before, after);
        assert!(vote.q_score > 0.0);
    }
}
