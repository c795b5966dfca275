// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! CYNIC — the designated PBFT coordinator. Never filtered by the
//! reputation floor (§4.2); scores systemic coherence between a Cell's
//! stated risk and its stated complexity rather than either alone.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::cell::{Cell, Reality};
use crate::domain::constants::clamp_q_score;
use crate::domain::judge::{Judge, JudgeCapabilities, JudgeError, JudgeHealth};
use crate::domain::tier::Tier;
use crate::domain::vote::DogVote;

pub struct CynicDog;

impl CynicDog {
    pub fn new() -> Self {
        Self
    }

    /// A Cell that claims low risk but high complexity, or vice versa, is
    /// internally incoherent and scores worse than either extreme alone.
    fn coherence_score(cell: &Cell) -> f64 {
        let incoherence = (cell.risk - (1.0 - cell.complexity)).abs();
        clamp_q_score((1.0 - incoherence) * 100.0 * (1.0 - cell.risk * 0.5))
    }
}

impl Default for CynicDog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Judge for CynicDog {
    fn judge_id(&self) -> &str {
        "cynic"
    }

    async fn analyze(
        &self,
        cell: &Cell,
        _budget_usd: f64,
        _context_hints: &[String],
    ) -> Result<DogVote, JudgeError> {
        let score = Self::coherence_score(cell);
        Ok(DogVote::new(self.judge_id().into(), cell.cell_id, score, 0.45)
            .with_reasoning("systemic coherence between stated risk and complexity"))
    }

    async fn health(&self) -> JudgeHealth {
        JudgeHealth::Healthy
    }

    fn capabilities(&self) -> JudgeCapabilities {
        JudgeCapabilities {
            min_tier: Tier::Reflex,
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
            reputation: 85.0,
            is_coordinator: true,
            is_guardian: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::{Analysis, CellBuilder};

    #[tokio::test]
    async fn coherent_cell_scores_higher_than_incoherent() {
        let cynic = CynicDog::new();
        let coherent = CellBuilder::new(Reality::Code, Analysis::Judge).risk(0.1).complexity(0.9).build();
        let incoherent = CellBuilder::new(Reality::Code, Analysis::Judge).risk(0.9).complexity(0.9).build();

        let coherent_vote = cynic.analyze(&coherent, 1.0, &[]).await.unwrap();
        let incoherent_vote = cynic.analyze(&incoherent, 1.0, &[]).await.unwrap();
        assert!(coherent_vote.q_score > incoherent_vote.q_score);
    }

    #[test]
    fn coordinator_is_never_reputation_filtered() {
        let caps = CynicDog::new().capabilities();
        assert!(caps.is_coordinator);
    }
}
