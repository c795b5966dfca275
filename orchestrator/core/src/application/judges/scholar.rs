// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! SCHOLAR — the retrieval-backed judge. Looks up Cells with a similar
//! `state_key` via [`ScholarRepository`] and blends that similarity signal
//! with a read-only Q-table peek, exactly as described in §9's
//! cyclic-reference note: the blend happens only at analyze-time, and the
//! Q-table never depends back on Scholar.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::learning::LearningLoop;
use crate::domain::cell::{Cell, Reality};
use crate::domain::collaborators::ScholarRepository;
use crate::domain::constants::{clamp_q_score, PHI_INV2};
use crate::domain::judge::{Judge, JudgeCapabilities, JudgeError, JudgeHealth};
use crate::domain::qtable::QKey;
use crate::domain::tier::Tier;
use crate::domain::vote::DogVote;

/// Cold-buffer confidence when no similar past Cells are found.
const COLD_CONFIDENCE: f64 = 0.2;

/// Neutral score on a cold buffer: GROWL-territory, deliberately cautious.
const NEUTRAL_Q: f64 = 50.0;

pub struct ScholarDog {
    learning: Arc<LearningLoop>,
    repo: Arc<dyn ScholarRepository>,
}

impl ScholarDog {
    pub fn new(learning: Arc<LearningLoop>, repo: Arc<dyn ScholarRepository>) -> Self {
        Self { learning, repo }
    }
}

#[async_trait]
impl Judge for ScholarDog {
    fn judge_id(&self) -> &str {
        "scholar"
    }

    async fn analyze(
        &self,
        cell: &Cell,
        _budget_usd: f64,
        _context_hints: &[String],
    ) -> Result<DogVote, JudgeError> {
        let state_key = cell.state_key();
        let similar = self
            .repo
            .similar(&state_key, 3)
            .await
            .map_err(|e| JudgeError::ExecutionFailed(e.to_string()))?;

        if similar.is_empty() {
            return Ok(DogVote::new(self.judge_id().into(), cell.cell_id, NEUTRAL_Q, COLD_CONFIDENCE)
                .with_reasoning("cold buffer, no similar past cells"));
        }

        // TF-IDF-style similarity is out of scope without an embedding
        // provider wired in; approximate it with the fraction of the
        // K-neighbor slots that were actually filled.
        let similarity = similar.len() as f64 / 3.0;
        let blend_weight = (self.blend_weight(&similar) * PHI_INV2).clamp(0.0, PHI_INV2);
        let qtable_q = self.learning.q_value_for(&state_key, "wag") * 100.0;
        let q_score = clamp_q_score((1.0 - blend_weight) * (similarity * 100.0) + blend_weight * qtable_q);
        let confidence = (similarity * PHI_INV2).min(crate::domain::constants::MAX_CONFIDENCE);

        Ok(DogVote::new(self.judge_id().into(), cell.cell_id, q_score, confidence)
            .with_reasoning(format!("{} similar past cells, blended with q-table", similar.len())))
    }

    async fn health(&self) -> JudgeHealth {
        JudgeHealth::Healthy
    }

    fn capabilities(&self) -> JudgeCapabilities {
        JudgeCapabilities {
            min_tier: Tier::Micro,
            uses_llm: true,
            supported_realities: HashSet::from([
                Reality::Code,
                Reality::Market,
                Reality::Social,
                Reality::Human,
                Reality::Cynic,
                Reality::Solana,
                Reality::Cosmos,
            ]),
            reputation: 55.0,
            is_coordinator: false,
            is_guardian: false,
        }
    }
}

impl ScholarDog {
    /// `min(visits / F(8), PHI_INV) `-style weight, approximated here by
    /// the neighbor count since the in-memory repository tracks no visit
    /// count of its own (§9: read-only access, no reverse dependency).
    fn blend_weight(&self, similar: &[QKey]) -> f64 {
        (similar.len() as f64 / crate::domain::constants::fib::F8 as f64)
            .min(crate::domain::constants::MAX_CONFIDENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::{Analysis, CellBuilder};
    use crate::infrastructure::event_bus::EventBus;
    use crate::infrastructure::memory::InMemoryStorage;

    #[tokio::test]
    async fn cold_buffer_returns_neutral_growl_territory() {
        let learning = LearningLoop::new(InMemoryStorage::new_storage(), EventBus::with_default_capacity());
        let repo = Arc::new(crate::infrastructure::memory::InMemoryScholarRepository::default());
        let scholar = ScholarDog::new(learning, repo);
        let cell = CellBuilder::new(Reality::Code, Analysis::Judge).build();
        let vote = scholar.analyze(&cell, 1.0, &[]).await.unwrap();
        assert_eq!(vote.confidence, COLD_CONFIDENCE);
        assert_eq!(vote.q_score, NEUTRAL_Q);
    }

    #[tokio::test]
    async fn warm_buffer_raises_confidence() {
        let learning = LearningLoop::new(InMemoryStorage::new_storage(), EventBus::with_default_capacity());
        let repo = Arc::new(crate::infrastructure::memory::InMemoryScholarRepository::default());
        let cell = CellBuilder::new(Reality::Code, Analysis::Judge).build();
        let state_key = cell.state_key();
        repo.record(QKey::new(&state_key, "wag"));
        repo.record(QKey::new(&state_key, "growl"));

        let scholar = ScholarDog::new(learning, repo);
        let vote = scholar.analyze(&cell, 1.0, &[]).await.unwrap();
        assert!(vote.confidence > COLD_CONFIDENCE);
    }
}
