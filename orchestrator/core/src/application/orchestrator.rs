// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tier orchestrator (C7) — selects a cognitive tier for each Cell, runs
//! the panel/consensus pipeline at that tier, and drives the rest of the
//! cycle (DECIDE/LEARN/ACCOUNT) by publishing events for the other
//! components to pick up; EMERGE happens implicitly, since the residual
//! detector already subscribes to `JUDGMENT_CREATED` (§4.7).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::application::circuit_breaker::CircuitBreaker;
use crate::application::consensus::ConsensusAggregator;
use crate::application::guardrails::{DecisionContext, GuardrailChain};
use crate::application::learning::LearningLoop;
use crate::application::lod_controller::LodController;
use crate::application::panel::{Panel, PanelError};
use crate::domain::cell::{Analysis, Cell, CellBuilder, Reality};
use crate::domain::collaborators::Storage;
use crate::domain::config::{BudgetConfig, TierTimeouts};
use crate::domain::constants::{MAX_CONFIDENCE, PHI_INV2};
use crate::domain::events::{KernelEvent, MetaProbeResult};
use crate::domain::judgment::{Judgment, JudgmentBuilder};
use crate::domain::tier::{SystemLod, Tier};
use crate::domain::vote::DogVote;
use crate::infrastructure::event_bus::EventBus;

/// ~4 hour cadence between META axiom-integrity probe runs (§4.7.1).
const META_PROBE_INTERVAL_S: u64 = 4 * 60 * 60;

/// Keep the last F(8) = 21 probe runs for regression comparison.
const META_PROBE_HISTORY: usize = 21;

/// A pass-rate drop larger than this versus the previous run flags a
/// regression.
const REGRESSION_DROP: f64 = 0.20;

const AXIOM_NAMES: [&str; 4] = ["identity", "continuity", "alignment", "emergence"];

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("circuit breaker is open, fast-failing this cell")]
    CircuitOpen,

    #[error("panel failed: {0}")]
    PanelFailed(#[from] PanelError),
}

/// Maps each surviving vote's `judge_id` onto one of the four axiom
/// dimensions and scores it by `q_score` weighted by confidence. Judges
/// outside the fixed four (oracle, scholar) don't carry an axiom.
fn axiom_fusion(votes: &[DogVote]) -> HashMap<String, f64> {
    let mut scores = HashMap::new();
    for vote in votes {
        let axiom = match vote.judge_id.0.as_str() {
            "guardian" => Some("identity"),
            "cynic" => Some("continuity"),
            "analyst" => Some("alignment"),
            "architect" => Some("emergence"),
            _ => None,
        };
        if let Some(axiom) = axiom {
            let weight = (vote.confidence / MAX_CONFIDENCE).min(1.0);
            scores.insert(axiom.to_string(), (vote.q_score / 100.0 * weight).clamp(0.0, 1.0));
        }
    }
    scores
}

fn tier_from_consciousness(consciousness: u8) -> Tier {
    match consciousness {
        0 | 1 => Tier::Reflex,
        2..=4 => Tier::Micro,
        5 | 6 => Tier::Macro,
        _ => Tier::Meta,
    }
}

struct MetaProbeSpec {
    probe_id: &'static str,
    reality: Reality,
    analysis: Analysis,
    risk: f64,
    complexity: f64,
    expected_min: f64,
    expected_max: f64,
}

/// The five canonical probe cells (§4.7.1): known-good, known-bad and
/// known-ambiguous inputs whose expected `q_score` band should stay stable
/// run over run.
fn canonical_probes() -> [MetaProbeSpec; 5] {
    [
        MetaProbeSpec { probe_id: "calm_code_review", reality: Reality::Code, analysis: Analysis::Judge, risk: 0.1, complexity: 0.3, expected_min: 55.0, expected_max: 100.0 },
        MetaProbeSpec { probe_id: "risky_market_act", reality: Reality::Market, analysis: Analysis::Act, risk: 0.9, complexity: 0.6, expected_min: 0.0, expected_max: 45.0 },
        MetaProbeSpec { probe_id: "social_noise", reality: Reality::Social, analysis: Analysis::Judge, risk: 0.2, complexity: 0.2, expected_min: 35.0, expected_max: 95.0 },
        MetaProbeSpec { probe_id: "dangerous_solana_act", reality: Reality::Solana, analysis: Analysis::Act, risk: 1.0, complexity: 0.8, expected_min: 0.0, expected_max: 0.0 },
        MetaProbeSpec { probe_id: "ambiguous_cosmos_signal", reality: Reality::Cosmos, analysis: Analysis::Judge, risk: 0.5, complexity: 0.5, expected_min: 25.0, expected_max: 75.0 },
    ]
}

pub struct MetaProbeRun {
    pub pass_rate: f64,
    pub regression: bool,
    pub results: Vec<MetaProbeResult>,
}

/// Routes each Cell to a tier, runs the judgment pipeline there, and emits
/// the events that drive the rest of the cycle.
pub struct TierOrchestrator {
    panel: Panel,
    learning: Arc<LearningLoop>,
    lod: Arc<LodController>,
    circuit: Arc<CircuitBreaker>,
    guardrails: GuardrailChain,
    storage: Arc<Storage>,
    bus: EventBus,
    budget: BudgetConfig,
    tier_timeouts: TierTimeouts,
    axiom_counters: DashMap<Reality, [f64; 4]>,
    meta_history: Mutex<VecDeque<f64>>,
    reputation_signal: f64,
}

impl TierOrchestrator {
    pub fn new(
        panel: Panel,
        learning: Arc<LearningLoop>,
        lod: Arc<LodController>,
        circuit: Arc<CircuitBreaker>,
        guardrails: GuardrailChain,
        storage: Arc<Storage>,
        bus: EventBus,
        budget: BudgetConfig,
    ) -> Arc<Self> {
        Self::with_tier_timeouts(panel, learning, lod, circuit, guardrails, storage, bus, budget, TierTimeouts::default())
    }

    /// Build with an explicit [`TierTimeouts`], honoring the §6 config
    /// surface's `tier_soft_timeouts` override instead of each [`Tier`]'s
    /// hardcoded default.
    #[allow(clippy::too_many_arguments)]
    pub fn with_tier_timeouts(
        panel: Panel,
        learning: Arc<LearningLoop>,
        lod: Arc<LodController>,
        circuit: Arc<CircuitBreaker>,
        guardrails: GuardrailChain,
        storage: Arc<Storage>,
        bus: EventBus,
        budget: BudgetConfig,
        tier_timeouts: TierTimeouts,
    ) -> Arc<Self> {
        let reputation_signal = panel.average_reputation();
        Arc::new(Self {
            panel,
            learning,
            lod,
            circuit,
            guardrails,
            storage,
            bus,
            budget,
            tier_timeouts,
            axiom_counters: DashMap::new(),
            meta_history: Mutex::new(VecDeque::with_capacity(META_PROBE_HISTORY)),
            reputation_signal,
        })
    }

    /// Run the full cycle for one Cell: select a tier, gate on the circuit
    /// breaker, run the panel, escalate MICRO -> MACRO on consensus
    /// failure, and publish DECIDE/LEARN/ACCOUNT. `budget_usd` is the
    /// remaining session budget, not the Cell's own ask.
    ///
    /// A veto or a consensus that never reaches quorum still yields a
    /// `Judgment` (forced to BARK, or otherwise as fused) rather than an
    /// error: per §4.3 "a failed MACRO consensus still produces a Judgment
    /// for learning". Only a panel that can't muster 3 surviving votes, or
    /// an open circuit breaker, fails the pipeline outright.
    pub async fn process(&self, cell: Cell, budget_usd: f64) -> Result<Judgment, OrchestratorError> {
        if self.circuit.allow_request().is_err() {
            metrics::counter!("aegis_circuit_open_total").increment(1);
            return Err(OrchestratorError::CircuitOpen);
        }

        let tier = self.select_tier(&cell, budget_usd);
        self.bus.publish(KernelEvent::JudgmentRequested {
            cell_id: cell.cell_id,
            reality: cell.reality,
            level: tier,
        });

        let mut result = self.run_at_tier(&cell, tier, budget_usd).await;

        let failed_at_micro = match &result {
            Ok((_, reached)) => !reached,
            Err(_) => true,
        };
        if failed_at_micro && tier == Tier::Micro {
            let escalated_cap = self.lod.current().cap(Tier::Macro);
            if escalated_cap == Tier::Macro && budget_usd > 0.0001 {
                debug!(cell_id = %cell.cell_id, "escalating MICRO consensus failure to MACRO");
                result = self.run_at_tier(&cell, Tier::Macro, budget_usd).await;
            }
        }

        match result {
            Ok((judgment, _reached)) => {
                self.circuit.record_success();
                Ok(judgment)
            }
            Err(err) => {
                self.circuit.record_failure();
                if let OrchestratorError::PanelFailed(_) = &err {
                    metrics::counter!("aegis_panel_failed_total").increment(1);
                }
                self.bus.publish(KernelEvent::JudgmentFailed {
                    cell_id: cell.cell_id,
                    error: err.to_string(),
                    circuit_state: Some(self.circuit.state().as_str().to_string()),
                    failure_count: None,
                });
                Err(err)
            }
        }
    }

    /// Soft timeout for `tier`, honoring the §6 config surface's
    /// `tier_soft_timeouts` override instead of [`Tier::soft_timeout_ms`]'s
    /// hardcoded default.
    fn timeout_ms(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Reflex => self.tier_timeouts.reflex_ms,
            Tier::Micro => self.tier_timeouts.micro_ms,
            Tier::Macro => self.tier_timeouts.macro_ms,
            Tier::Meta => self.tier_timeouts.meta_ms,
        }
    }

    /// Runs the panel and fuses its votes at `tier`, returning the emitted
    /// `Judgment` alongside whether consensus was actually reached. A
    /// veto (explicit or judge-raised) or an unreached quorum still yields
    /// a Judgment (forced to `q_score = 0` for a veto) — only a panel that
    /// can't muster the minimum surviving votes is a hard error.
    async fn run_at_tier(&self, cell: &Cell, tier: Tier, budget_usd: f64) -> Result<(Judgment, bool), OrchestratorError> {
        let state_key = cell.state_key();
        let per_judge_budget = budget_usd * tier.per_judge_budget_fraction();
        let timeout = Duration::from_millis(self.timeout_ms(tier));

        let outcome = self
            .panel
            .run_at_tier(cell, tier, per_judge_budget, &[], timeout)
            .await?;
        let consensus = ConsensusAggregator::aggregate(&outcome.votes, outcome.veto);

        let axiom_scores = axiom_fusion(&outcome.votes);
        self.update_axiom_counters(cell.reality, &axiom_scores);

        let dog_votes: HashMap<_, _> = outcome.votes.iter().cloned().map(|v| (v.judge_id.clone(), v)).collect();
        let total_cost: f64 = outcome.votes.iter().map(|v| v.cost_usd).sum();

        let judgment = JudgmentBuilder::new(cell.cell_id, state_key, cell.reality, tier)
            .scores(consensus.q_score, consensus.confidence)
            .consensus(consensus.reached, consensus.votes, consensus.quorum)
            .residual_variance(consensus.residual_variance)
            .axiom_scores(axiom_scores)
            .dog_votes(dog_votes)
            .build();

        if let Err(err) = self.storage.judgments.save(&judgment).await {
            tracing::warn!(error = %err, "failed to persist judgment");
        }

        self.bus.publish(KernelEvent::JudgmentCreated {
            judgment_id: judgment.judgment_id,
            cell_id: judgment.cell_id,
            state_key: judgment.state_key.clone(),
            reality: judgment.reality,
            verdict: judgment.verdict,
            q_score: judgment.q_score,
            confidence: judgment.confidence,
            residual_variance: judgment.residual_variance,
            dog_votes: judgment.dog_votes.iter().map(|(k, v)| (k.0.clone(), v.clone())).collect(),
            level_used: judgment.level_used,
        });

        if consensus.reached {
            self.bus.publish(KernelEvent::ConsensusReached {
                judgment_id: judgment.judgment_id,
                votes: consensus.votes,
                quorum: consensus.quorum,
                residual_variance: Some(consensus.residual_variance),
            });
        } else {
            metrics::counter!("aegis_consensus_failed_total", "tier" => tier.as_str()).increment(1);
            self.bus.publish(KernelEvent::ConsensusFailed {
                judgment_id: judgment.judgment_id,
                votes: consensus.votes,
                quorum: consensus.quorum,
                residual_variance: Some(consensus.residual_variance),
            });
        }

        self.decide(cell, &judgment, budget_usd, total_cost).await;
        self.learn(&judgment);
        self.account(cell, &judgment, total_cost, budget_usd);

        Ok((judgment, consensus.reached))
    }

    /// DECIDE + ACT: clear the guardrail chain, then publish `DECISION_MADE`
    /// for the action proposer's subscriber to pick up. A rejected decision
    /// never reaches the action queue, but the Judgment itself still stands.
    async fn decide(&self, cell: &Cell, judgment: &Judgment, budget_usd: f64, cost_usd: f64) {
        let action_prompt = if cell.context.trim().is_empty() {
            format!("{} verdict on {}", judgment.verdict, judgment.state_key)
        } else {
            cell.context.clone()
        };
        let decision = DecisionContext::from_judgment(judgment, budget_usd, cost_usd, action_prompt.clone());

        match self.guardrails.evaluate(&decision).await {
            Ok(()) => {
                self.bus.publish(KernelEvent::DecisionMade {
                    verdict: judgment.verdict,
                    reality: judgment.reality,
                    state_key: judgment.state_key.clone(),
                    q_value: judgment.q_score / 100.0,
                    action_prompt: Some(action_prompt),
                    judgment_id: judgment.judgment_id,
                });
            }
            Err(rejection) => {
                metrics::counter!("aegis_guardrail_blocked_total", "guardrail" => rejection.guardrail.clone()).increment(1);
                debug!(
                    guardrail = %rejection.guardrail,
                    reason = %rejection.reason,
                    "decision blocked before reaching the action queue"
                );
            }
        }
    }

    /// LEARN: publish a `LEARNING_EVENT` the learning loop's subscriber
    /// will apply as a TD(0)/EWC update.
    fn learn(&self, judgment: &Judgment) {
        let reward = (judgment.q_score / 100.0) * if judgment.unnameable_detected { 0.5 } else { 1.0 };
        self.bus.publish(KernelEvent::LearningEvent {
            state_key: judgment.state_key.clone(),
            action: judgment.verdict.as_str().to_string(),
            reward,
            judgment_id: Some(judgment.judgment_id),
            loop_name: "tier_orchestrator".to_string(),
        });
    }

    /// ACCOUNT: publish the cost of this cycle and warn/exhaust the
    /// session budget as appropriate.
    fn account(&self, cell: &Cell, judgment: &Judgment, cost_usd: f64, budget_usd: f64) {
        self.bus.publish(KernelEvent::CostAccounted {
            cell_id: cell.cell_id,
            judgment_id: judgment.judgment_id,
            cost_usd,
        });

        let remaining = (budget_usd - cost_usd).max(0.0);
        if remaining <= 0.0001 {
            metrics::counter!("aegis_budget_exhausted_total").increment(1);
            self.bus.publish(KernelEvent::BudgetExhausted { cell_id: cell.cell_id });
        } else if budget_usd > 0.0 && remaining < budget_usd * PHI_INV2 {
            self.bus.publish(KernelEvent::BudgetWarning { cell_id: cell.cell_id, remaining_usd: remaining });
        }
    }

    /// Tier selection (§4.7), in fixed priority order: an emergency LOD
    /// forces REFLEX outright; otherwise a blended signal (or, cold, the
    /// Cell's own consciousness hint) proposes a tier, which a REDUCED LOD
    /// and budget stress can then only cap down, never up; the current LOD
    /// is reapplied last so the result is always within its bound
    /// regardless of path (idempotent, property 6 of §8).
    fn select_tier(&self, cell: &Cell, remaining_budget_usd: f64) -> Tier {
        let lod = self.lod.current();

        if lod >= SystemLod::Emergency {
            return lod.cap(Tier::Reflex);
        }

        if remaining_budget_usd <= 0.0001 {
            return lod.cap(Tier::Reflex);
        }

        let mut tier = self.signal_tier(cell);

        if lod == SystemLod::Reduced {
            tier = tier.min(Tier::Micro);
        }

        let session_budget = self.budget.session_usd.max(remaining_budget_usd);
        let remaining_fraction = if session_budget > 0.0 {
            (remaining_budget_usd / session_budget).clamp(0.0, 1.0)
        } else {
            1.0
        };
        if remaining_fraction < PHI_INV2 {
            tier = tier.min(Tier::Micro);
        }

        lod.cap(tier)
    }

    /// The blended tier-selection signal: `0.4 * axiom_maturity +
    /// 0.3 * reputation + 0.3 * oracle_confidence`, mapped onto the four
    /// tiers. META additionally requires all four axiom counters to be
    /// active for this Cell's reality; otherwise it caps at MACRO. A Cell
    /// with no learned signal at all falls back to its own consciousness
    /// hint (§4.7.5).
    fn signal_tier(&self, cell: &Cell) -> Tier {
        let state_key = cell.state_key();
        let axiom_maturity = self.axiom_maturity(cell.reality);
        let (_, _, oracle_confidence) = self.learning.best_known(&state_key);

        if axiom_maturity == 0.0 && oracle_confidence == 0.0 {
            return tier_from_consciousness(cell.consciousness);
        }

        let signal = 0.4 * axiom_maturity + 0.3 * self.reputation_signal + 0.3 * oracle_confidence;

        if signal < PHI_INV2 {
            Tier::Reflex
        } else if signal < MAX_CONFIDENCE {
            Tier::Micro
        } else if signal < 0.82 {
            Tier::Macro
        } else if self.axiom_counters_all_active(cell.reality) {
            Tier::Meta
        } else {
            Tier::Macro
        }
    }

    fn axiom_maturity(&self, reality: Reality) -> f64 {
        self.axiom_counters.get(&reality).map(|c| c.iter().sum::<f64>() / 4.0).unwrap_or(0.0)
    }

    fn axiom_counters_all_active(&self, reality: Reality) -> bool {
        self.axiom_counters.get(&reality).map(|c| c.iter().all(|v| *v >= MAX_CONFIDENCE)).unwrap_or(false)
    }

    fn update_axiom_counters(&self, reality: Reality, scores: &HashMap<String, f64>) {
        let mut entry = self.axiom_counters.entry(reality).or_insert([0.0; 4]);
        for (i, name) in AXIOM_NAMES.iter().enumerate() {
            if let Some(v) = scores.get(*name) {
                entry[i] = (entry[i] + v) / 2.0;
            }
        }
    }

    /// Run the five canonical probes at META depth and record a pass-rate
    /// sample. A drop of more than [`REGRESSION_DROP`] versus the previous
    /// run flags a regression.
    pub async fn run_meta_probe(&self) -> MetaProbeRun {
        let mut results = Vec::with_capacity(5);
        for spec in canonical_probes() {
            let cell = CellBuilder::new(spec.reality, spec.analysis)
                .risk(spec.risk)
                .complexity(spec.complexity)
                .consciousness(7)
                .build();
            let observed = match self.run_at_tier(&cell, Tier::Meta, self.budget.session_usd).await {
                Ok((judgment, _)) => judgment.q_score,
                Err(_) => -1.0,
            };
            let passed = observed >= spec.expected_min && observed <= spec.expected_max;
            results.push(MetaProbeResult {
                probe_id: spec.probe_id.to_string(),
                expected_min: spec.expected_min,
                expected_max: spec.expected_max,
                observed,
                passed,
                ran_at: Utc::now(),
            });
        }

        let pass_rate = results.iter().filter(|r| r.passed).count() as f64 / results.len() as f64;

        let regression = {
            let mut history = self.meta_history.lock();
            let previous = history.back().copied();
            history.push_back(pass_rate);
            while history.len() > META_PROBE_HISTORY {
                history.pop_front();
            }
            previous.map(|prev| prev - pass_rate > REGRESSION_DROP).unwrap_or(false)
        };

        self.bus.publish(KernelEvent::MetaCycle {
            pass_rate,
            regression,
            results: results.clone(),
        });

        MetaProbeRun { pass_rate, regression, results }
    }

    /// Whether a META probe cycle may run right now. `false` while the
    /// system is held at `EMERGENCY` LOD or worse: §5 reserves the
    /// scheduler's attention for the judgment backlog under sustained
    /// pressure, so a META probe is not dispatched until the LOD controller
    /// recovers.
    pub fn meta_probe_allowed(&self) -> bool {
        self.lod.current() < SystemLod::Emergency
    }

    /// Spawn the background META probe loop on its ~4 hour cadence. Skips a
    /// cycle (logging why) instead of running it whenever
    /// [`Self::meta_probe_allowed`] is false.
    pub fn spawn_meta_probe(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(META_PROBE_INTERVAL_S));
            interval.tick().await; // first tick fires immediately; skip it.
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        if !self.meta_probe_allowed() {
                            debug!("skipping META probe cycle: system held at EMERGENCY LOD");
                            continue;
                        }
                        self.run_meta_probe().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use async_trait::async_trait;

    use crate::domain::cell::{Analysis, CellBuilder, Reality};
    use crate::domain::collaborators::Storage;
    use crate::domain::config::BudgetConfig;
    use crate::domain::judge::{Judge, JudgeCapabilities, JudgeError, JudgeHealth};
    use crate::infrastructure::memory::InMemoryStorage;

    struct StubJudge {
        id: &'static str,
        score: f64,
        veto: bool,
        min_tier: Tier,
    }

    #[async_trait]
    impl Judge for StubJudge {
        fn judge_id(&self) -> &str {
            self.id
        }

        async fn analyze(&self, cell: &Cell, _budget_usd: f64, _hints: &[String]) -> Result<DogVote, JudgeError> {
            Ok(DogVote::new(self.id.into(), cell.cell_id, self.score, 0.5).with_veto(self.veto))
        }

        async fn health(&self) -> JudgeHealth {
            JudgeHealth::Healthy
        }

        fn capabilities(&self) -> JudgeCapabilities {
            JudgeCapabilities {
                min_tier: self.min_tier,
                uses_llm: false,
                supported_realities: HashSet::from([Reality::Code]),
                reputation: 80.0,
                is_coordinator: false,
                is_guardian: self.veto,
            }
        }
    }

    fn storage() -> Arc<Storage> {
        InMemoryStorage::new_storage()
    }

    fn orchestrator(panel: Panel) -> Arc<TierOrchestrator> {
        let bus = EventBus::with_default_capacity();
        let learning = LearningLoop::new(storage(), bus.clone());
        let lod = Arc::new(LodController::new(3, bus.clone()));
        let circuit = Arc::new(CircuitBreaker::new(5, Duration::from_secs(60)));
        TierOrchestrator::new(panel, learning, lod, circuit, GuardrailChain::standard(), storage(), bus, BudgetConfig::default())
    }

    fn safe_cell() -> Cell {
        CellBuilder::new(Reality::Code, Analysis::Judge).consciousness(0).build()
    }

    #[tokio::test]
    async fn meta_probe_is_refused_while_lod_is_held_at_emergency() {
        let panel = Panel::new(vec![Arc::new(StubJudge {
            id: "a",
            score: 80.0,
            veto: false,
            min_tier: Tier::Reflex,
        })]);
        let orchestrator = orchestrator(panel);
        assert!(orchestrator.meta_probe_allowed());

        let emergency = crate::application::lod_controller::HealthMetrics {
            queue_depth: 89,
            ..Default::default()
        };
        for _ in 0..3 {
            orchestrator.lod.tick(&emergency);
        }
        assert_eq!(orchestrator.lod.current(), SystemLod::Emergency);
        assert!(!orchestrator.meta_probe_allowed());
    }

    #[tokio::test]
    async fn reflex_tier_resolves_a_calm_cell() {
        let panel = Panel::new(vec![
            Arc::new(StubJudge { id: "a", score: 80.0, veto: false, min_tier: Tier::Reflex }),
            Arc::new(StubJudge { id: "b", score: 82.0, veto: false, min_tier: Tier::Reflex }),
            Arc::new(StubJudge { id: "c", score: 78.0, veto: false, min_tier: Tier::Reflex }),
        ]);
        let orchestrator = orchestrator(panel);
        let judgment = orchestrator.process(safe_cell(), 1.0).await.unwrap();
        assert_eq!(judgment.level_used, Tier::Reflex);
    }

    #[tokio::test]
    async fn explicitly_dangerous_cell_is_forced_to_bark_regardless_of_votes() {
        let panel = Panel::new(vec![
            Arc::new(StubJudge { id: "a", score: 80.0, veto: false, min_tier: Tier::Reflex }),
            Arc::new(StubJudge { id: "b", score: 80.0, veto: false, min_tier: Tier::Reflex }),
            Arc::new(StubJudge { id: "c", score: 80.0, veto: false, min_tier: Tier::Reflex }),
        ]);
        let orchestrator = orchestrator(panel);
        let dangerous = CellBuilder::new(Reality::Code, Analysis::Act).risk(1.0).consciousness(0).build();
        let judgment = orchestrator.process(dangerous, 1.0).await.unwrap();
        assert_eq!(judgment.q_score, 0.0);
        assert_eq!(judgment.verdict, crate::domain::judgment::Verdict::Bark);
        assert!(!judgment.consensus_reached);
    }

    #[tokio::test]
    async fn micro_consensus_failure_escalates_to_macro() {
        let panel = Panel::new(vec![
            Arc::new(StubJudge { id: "a", score: 70.0, veto: false, min_tier: Tier::Reflex }),
            Arc::new(StubJudge { id: "b", score: 72.0, veto: false, min_tier: Tier::Reflex }),
            Arc::new(StubJudge { id: "c", score: 74.0, veto: false, min_tier: Tier::Macro }),
        ]);
        let orchestrator = orchestrator(panel);
        let cell = CellBuilder::new(Reality::Code, Analysis::Judge).consciousness(3).build();
        let judgment = orchestrator.process(cell, 1.0).await.unwrap();
        assert_eq!(judgment.level_used, Tier::Macro);
    }

    #[tokio::test]
    async fn open_circuit_fast_fails_before_running_the_panel() {
        let panel = Panel::new(vec![
            Arc::new(StubJudge { id: "a", score: 80.0, veto: false, min_tier: Tier::Reflex }),
            Arc::new(StubJudge { id: "b", score: 80.0, veto: false, min_tier: Tier::Reflex }),
            Arc::new(StubJudge { id: "c", score: 80.0, veto: false, min_tier: Tier::Reflex }),
        ]);
        let orchestrator = orchestrator(panel);
        for _ in 0..5 {
            orchestrator.circuit.record_failure();
        }
        let result = orchestrator.process(safe_cell(), 1.0).await;
        assert!(matches!(result, Err(OrchestratorError::CircuitOpen)));
    }
}
