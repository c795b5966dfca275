// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Judge panel (C3) — runs every live judge on one Cell in parallel,
//! enforcing a per-judge timeout and the reputation filter, and returns
//! the surviving votes for the consensus aggregator.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::cell::Cell;
use crate::domain::judge::{Judge, JudgeError};
use crate::domain::tier::Tier;
use crate::domain::vote::DogVote;

/// Reputation floor below which a non-coordinator judge is skipped (§4.2).
const REPUTATION_FLOOR: f64 = 38.2;

/// Minimum surviving votes required for any consensus path (§4.2).
pub const MIN_SURVIVING_VOTES: usize = 3;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("only {surviving} of {total} judges survived, below the minimum of {MIN_SURVIVING_VOTES}")]
    InsufficientVotes { surviving: usize, total: usize },
}

pub struct PanelOutcome {
    pub votes: Vec<DogVote>,
    /// True if any surviving judge set veto, or the Cell was explicitly
    /// dangerous; the aggregator zeroes the fused score when this is set.
    pub veto: bool,
}

pub struct Panel {
    judges: Vec<Arc<dyn Judge>>,
}

impl Panel {
    pub fn new(judges: Vec<Arc<dyn Judge>>) -> Self {
        Self { judges }
    }

    pub fn len(&self) -> usize {
        self.judges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.judges.is_empty()
    }

    /// Mean judge reputation across the whole panel, normalized to `[0, 1]`.
    /// Feeds the tier orchestrator's blended tier-selection signal (§4.7).
    pub fn average_reputation(&self) -> f64 {
        if self.judges.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.judges.iter().map(|j| j.capabilities().reputation).sum();
        (sum / self.judges.len() as f64 / 100.0).clamp(0.0, 1.0)
    }

    /// Judges eligible to run on this Cell: reputation floor applied only
    /// when at least `MIN_SURVIVING_VOTES` judges would remain; the
    /// coordinator is never filtered.
    fn eligible_judges(&self) -> Vec<Arc<dyn Judge>> {
        let above_floor: Vec<Arc<dyn Judge>> = self
            .judges
            .iter()
            .filter(|j| {
                let caps = j.capabilities();
                caps.is_coordinator || caps.reputation >= REPUTATION_FLOOR
            })
            .cloned()
            .collect();

        if above_floor.len() >= MIN_SURVIVING_VOTES {
            above_floor
        } else {
            self.judges.clone()
        }
    }

    /// Judges eligible to run at `tier`: REFLEX excludes every LLM-backed
    /// judge outright (§4.7), and no judge runs below its own `min_tier`.
    fn judges_for_tier(&self, judges: Vec<Arc<dyn Judge>>, tier: Tier) -> Vec<Arc<dyn Judge>> {
        judges
            .into_iter()
            .filter(|j| {
                let caps = j.capabilities();
                if tier == Tier::Reflex && caps.uses_llm {
                    return false;
                }
                caps.min_tier <= tier
            })
            .collect()
    }

    /// Run the eligible judges in parallel against `cell`, each under
    /// `per_judge_timeout`. Judges that error or time out are dropped from
    /// the result silently (at debug level); at least `MIN_SURVIVING_VOTES`
    /// must survive or this call fails.
    pub async fn run(
        &self,
        cell: &Cell,
        budget_usd: f64,
        context_hints: &[String],
        per_judge_timeout: Duration,
    ) -> Result<PanelOutcome, PanelError> {
        self.run_judges(self.eligible_judges(), cell, budget_usd, context_hints, per_judge_timeout)
            .await
    }

    /// Run only the judges eligible for `tier`, per [`Panel::judges_for_tier`].
    /// Used by the tier orchestrator so REFLEX never dispatches to an
    /// LLM-backed judge and no judge runs below its declared `min_tier`.
    pub async fn run_at_tier(
        &self,
        cell: &Cell,
        tier: Tier,
        budget_usd: f64,
        context_hints: &[String],
        per_judge_timeout: Duration,
    ) -> Result<PanelOutcome, PanelError> {
        let judges = self.judges_for_tier(self.eligible_judges(), tier);
        self.run_judges(judges, cell, budget_usd, context_hints, per_judge_timeout)
            .await
    }

    async fn run_judges(
        &self,
        judges: Vec<Arc<dyn Judge>>,
        cell: &Cell,
        budget_usd: f64,
        context_hints: &[String],
        per_judge_timeout: Duration,
    ) -> Result<PanelOutcome, PanelError> {
        let total = judges.len();

        let futures = judges.into_iter().map(|judge| {
            let cell = cell.clone();
            let context_hints = context_hints.to_vec();
            async move {
                let judge_id = judge.judge_id().to_string();
                match tokio::time::timeout(
                    per_judge_timeout,
                    judge.analyze(&cell, budget_usd, &context_hints),
                )
                .await
                {
                    Ok(Ok(vote)) => Some(vote),
                    Ok(Err(JudgeError::Timeout(ms))) => {
                        debug!(judge_id, ms, "judge self-reported timeout");
                        None
                    }
                    Ok(Err(err)) => {
                        warn!(judge_id, error = %err, "judge failed, dropping vote");
                        None
                    }
                    Err(_) => {
                        debug!(judge_id, "judge exceeded per-judge timeout");
                        None
                    }
                }
            }
        });

        let results = futures::future::join_all(futures).await;
        let votes: Vec<DogVote> = results.into_iter().flatten().collect();

        if votes.len() < MIN_SURVIVING_VOTES {
            return Err(PanelError::InsufficientVotes {
                surviving: votes.len(),
                total,
            });
        }

        let veto = cell.is_explicitly_dangerous() || votes.iter().any(|v| v.veto);
        Ok(PanelOutcome { votes, veto })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::{CellBuilder, Analysis, CellId, Reality};
    use crate::domain::judge::{JudgeCapabilities, JudgeHealth};
    use crate::domain::tier::Tier;
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct StubJudge {
        id: &'static str,
        reputation: f64,
        score: f64,
        veto: bool,
        fail: bool,
        min_tier: Tier,
        uses_llm: bool,
    }

    impl StubJudge {
        fn simple(id: &'static str, reputation: f64, score: f64, veto: bool, fail: bool) -> Self {
            Self { id, reputation, score, veto, fail, min_tier: Tier::Reflex, uses_llm: false }
        }
    }

    #[async_trait]
    impl Judge for StubJudge {
        fn judge_id(&self) -> &str {
            self.id
        }

        async fn analyze(
            &self,
            cell: &Cell,
            _budget_usd: f64,
            _context_hints: &[String],
        ) -> Result<DogVote, JudgeError> {
            if self.fail {
                return Err(JudgeError::ExecutionFailed("stub failure".into()));
            }
            Ok(DogVote::new(
                self.id.into(),
                cell.cell_id,
                self.score,
                0.5,
            )
            .with_veto(self.veto))
        }

        async fn health(&self) -> JudgeHealth {
            JudgeHealth::Healthy
        }

        fn capabilities(&self) -> JudgeCapabilities {
            JudgeCapabilities {
                min_tier: self.min_tier,
                uses_llm: self.uses_llm,
                supported_realities: HashSet::from([Reality::Code]),
                reputation: self.reputation,
                is_coordinator: false,
                is_guardian: self.veto,
            }
        }
    }

    fn cell() -> Cell {
        CellBuilder::new(Reality::Code, Analysis::Judge).build()
    }

    #[tokio::test]
    async fn requires_minimum_surviving_votes() {
        let panel = Panel::new(vec![
            Arc::new(StubJudge::simple("a", 90.0, 50.0, false, false)),
            Arc::new(StubJudge::simple("b", 90.0, 50.0, false, true)),
        ]);
        let result = panel.run(&cell(), 1.0, &[], Duration::from_millis(50)).await;
        assert!(matches!(result, Err(PanelError::InsufficientVotes { .. })));
    }

    #[tokio::test]
    async fn veto_from_any_judge_propagates() {
        let panel = Panel::new(vec![
            Arc::new(StubJudge::simple("a", 90.0, 50.0, false, false)),
            Arc::new(StubJudge::simple("b", 90.0, 50.0, true, false)),
            Arc::new(StubJudge::simple("c", 90.0, 50.0, false, false)),
        ]);
        let outcome = panel.run(&cell(), 1.0, &[], Duration::from_millis(50)).await.unwrap();
        assert!(outcome.veto);
        assert_eq!(outcome.votes.len(), 3);
    }

    #[tokio::test]
    async fn low_reputation_judges_are_skipped_above_floor() {
        let panel = Panel::new(vec![
            Arc::new(StubJudge::simple("a", 90.0, 50.0, false, false)),
            Arc::new(StubJudge::simple("b", 90.0, 50.0, false, false)),
            Arc::new(StubJudge::simple("c", 90.0, 50.0, false, false)),
            Arc::new(StubJudge::simple("low", 10.0, 50.0, false, false)),
        ]);
        let outcome = panel.run(&cell(), 1.0, &[], Duration::from_millis(50)).await.unwrap();
        assert!(outcome.votes.iter().all(|v| v.judge_id.0 != "low"));
    }

    #[tokio::test]
    async fn reflex_tier_excludes_llm_backed_judges() {
        let panel = Panel::new(vec![
            Arc::new(StubJudge::simple("a", 90.0, 50.0, false, false)),
            Arc::new(StubJudge::simple("b", 90.0, 50.0, false, false)),
            Arc::new(StubJudge::simple("c", 90.0, 50.0, false, false)),
            Arc::new(StubJudge { id: "llm", reputation: 90.0, score: 50.0, veto: false, fail: false, min_tier: Tier::Micro, uses_llm: true }),
        ]);
        let outcome = panel
            .run_at_tier(&cell(), Tier::Reflex, 1.0, &[], Duration::from_millis(50))
            .await
            .unwrap();
        assert!(outcome.votes.iter().all(|v| v.judge_id.0 != "llm"));
    }

    #[tokio::test]
    async fn micro_tier_includes_llm_backed_judges() {
        let panel = Panel::new(vec![
            Arc::new(StubJudge::simple("a", 90.0, 50.0, false, false)),
            Arc::new(StubJudge::simple("b", 90.0, 50.0, false, false)),
            Arc::new(StubJudge::simple("c", 90.0, 50.0, false, false)),
            Arc::new(StubJudge { id: "llm", reputation: 90.0, score: 50.0, veto: false, fail: false, min_tier: Tier::Micro, uses_llm: true }),
        ]);
        let outcome = panel
            .run_at_tier(&cell(), Tier::Micro, 1.0, &[], Duration::from_millis(50))
            .await
            .unwrap();
        assert!(outcome.votes.iter().any(|v| v.judge_id.0 == "llm"));
    }

    #[test]
    fn cell_builder_test_helper_compiles() {
        let _ = CellId::new();
    }
}
