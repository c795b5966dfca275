// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! ARCHITECT — general-purpose heuristic judge focused on structural
//! complexity. Where ANALYST scans content for red flags, ARCHITECT
//! scores purely on the Cell's declared `complexity`, giving the panel an
//! independent axis of disagreement.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::cell::{Cell, Reality};
use crate::domain::constants::clamp_q_score;
use crate::domain::judge::{Judge, JudgeCapabilities, JudgeError, JudgeHealth};
use crate::domain::tier::Tier;
use crate::domain::vote::DogVote;

pub struct ArchitectDog;

impl ArchitectDog {
    pub fn new() -> Self {
        Self
    }

    /// Moderate complexity (change that does something, legibly) scores
    /// best; both "trivial" and "sprawling" score lower.
    fn structure_score(cell: &Cell) -> f64 {
        let distance_from_ideal = (cell.complexity - 0.382).abs();
        clamp_q_score((1.0 - distance_from_ideal).max(0.0) * 100.0)
    }
}

impl Default for ArchitectDog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Judge for ArchitectDog {
    fn judge_id(&self) -> &str {
        "architect"
    }

    async fn analyze(
        &self,
        cell: &Cell,
        _budget_usd: f64,
        _context_hints: &[String],
    ) -> Result<DogVote, JudgeError> {
        let score = Self::structure_score(cell);
        Ok(DogVote::new(self.judge_id().into(), cell.cell_id, score, 0.4)
            .with_reasoning("structural complexity distance from the φ⁻² sweet spot"))
    }

    async fn health(&self) -> JudgeHealth {
        JudgeHealth::Healthy
    }

    fn capabilities(&self) -> JudgeCapabilities {
        JudgeCapabilities {
            min_tier: Tier::Reflex,
            uses_llm: false,
            supported_realities: HashSet::from([Reality::Code, Reality::Cynic, Reality::Cosmos]),
            reputation: 65.0,
            is_coordinator: false,
            is_guardian: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::{Analysis, CellBuilder};

    #[tokio::test]
    async fn moderate_complexity_scores_best() {
        let architect = ArchitectDog::new();
        let moderate = CellBuilder::new(Reality::Code, Analysis::Judge).complexity(0.382).build();
        let extreme = CellBuilder::new(Reality::Code, Analysis::Judge).complexity(1.0).build();

        let moderate_vote = architect.analyze(&moderate, 1.0, &[]).await.unwrap();
        let extreme_vote = architect.analyze(&extreme, 1.0, &[]).await.unwrap();
        assert!(moderate_vote.q_score > extreme_vote.q_score);
    }
}
