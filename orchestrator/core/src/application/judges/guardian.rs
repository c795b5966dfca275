// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! GUARDIAN — the panel's sole veto-holder. Heuristic-only, REFLEX-capable;
//! flags risk/complexity combinations an anomaly detector would flag
//! without needing one.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::cell::{Cell, Reality};
use crate::domain::constants::clamp_q_score;
use crate::domain::judge::{Judge, JudgeCapabilities, JudgeError, JudgeHealth};
use crate::domain::tier::Tier;
use crate::domain::vote::DogVote;

/// Above this combined risk/complexity pressure, GUARDIAN vetoes even a
/// Cell that doesn't meet the hard `risk >= 1.0 && analysis == ACT` bar.
const VETO_PRESSURE: f64 = 0.97;

pub struct GuardianDog;

impl GuardianDog {
    pub fn new() -> Self {
        Self
    }

    fn anomaly_pressure(cell: &Cell) -> f64 {
        // Risk dominates; complexity compounds it rather than averaging it
        // away, so a simple cell can't dilute a genuinely risky one.
        (cell.risk * 0.7 + cell.complexity * 0.3).clamp(0.0, 1.0)
    }
}

impl Default for GuardianDog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Judge for GuardianDog {
    fn judge_id(&self) -> &str {
        "guardian"
    }

    async fn analyze(
        &self,
        cell: &Cell,
        _budget_usd: f64,
        _context_hints: &[String],
    ) -> Result<DogVote, JudgeError> {
        let pressure = Self::anomaly_pressure(cell);
        let dangerous = cell.is_explicitly_dangerous() || pressure >= VETO_PRESSURE;
        let q_score = if dangerous {
            0.0
        } else {
            clamp_q_score((1.0 - pressure) * 100.0)
        };

        Ok(DogVote::new(self.judge_id().into(), cell.cell_id, q_score, 0.5)
            .with_veto(dangerous)
            .with_reasoning(if dangerous {
                format!("anomaly pressure {pressure:.3} exceeds the veto threshold")
            } else {
                format!("anomaly pressure {pressure:.3} within tolerance")
            }))
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
            reputation: 90.0,
            is_coordinator: false,
            is_guardian: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::{Analysis, CellBuilder};

    #[tokio::test]
    async fn vetoes_explicitly_dangerous_cells() {
        let guardian = GuardianDog::new();
        let cell = CellBuilder::new(Reality::Code, Analysis::Act).risk(1.0).build();
        let vote = guardian.analyze(&cell, 1.0, &[]).await.unwrap();
        assert!(vote.veto);
        assert_eq!(vote.q_score, 0.0);
    }

    #[tokio::test]
    async fn calm_cells_score_highly_without_veto() {
        let guardian = GuardianDog::new();
        let cell = CellBuilder::new(Reality::Code, Analysis::Judge).risk(0.0).complexity(0.1).build();
        let vote = guardian.analyze(&cell, 1.0, &[]).await.unwrap();
        assert!(!vote.veto);
        assert!(vote.q_score > 80.0);
    }
}
