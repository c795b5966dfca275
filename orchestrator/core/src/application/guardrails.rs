// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Guardrail chain (C12) — PowerLimiter -> AlignmentChecker ->
//! TransparencyAudit -> HumanApprovalGate, in that fixed, deliberately
//! ordered sequence: cheap rule-based checks first, the human gate last
//! (§4.12). A block surfaces as a typed rejection that is recorded for
//! audit but never reaches the learning loop (§7).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::cell::Reality;
use crate::domain::judgment::{Judgment, Verdict};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailRejection {
    pub guardrail: String,
    pub reason: String,
    pub recommendation: String,
}

#[derive(Debug, Error)]
#[error("blocked by {0}: {1}")]
pub struct GuardrailError(pub String, pub String);

/// One link in the chain. Implementors only ever see the decision, never
/// mutate it; they either pass it through or reject it.
#[async_trait]
pub trait Guardrail: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self, decision: &DecisionContext) -> Result<(), GuardrailRejection>;
}

/// Everything a guardrail needs to decide, gathered from the Judgment and
/// the action it would dispatch.
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub verdict: Verdict,
    pub reality: Reality,
    pub q_score: f64,
    pub budget_usd: f64,
    pub cost_usd: f64,
    pub action_prompt: String,
}

impl DecisionContext {
    pub fn from_judgment(judgment: &Judgment, budget_usd: f64, cost_usd: f64, action_prompt: impl Into<String>) -> Self {
        Self {
            verdict: judgment.verdict,
            reality: judgment.reality,
            q_score: judgment.q_score,
            budget_usd,
            cost_usd,
            action_prompt: action_prompt.into(),
        }
    }
}

/// Rejects when the action would spend more than the remaining session
/// budget. Cheapest check, runs first.
pub struct PowerLimiter {
    pub max_fraction_of_remaining: f64,
}

impl Default for PowerLimiter {
    fn default() -> Self {
        Self {
            max_fraction_of_remaining: 0.618,
        }
    }
}

#[async_trait]
impl Guardrail for PowerLimiter {
    fn name(&self) -> &str {
        "power_limiter"
    }

    async fn check(&self, decision: &DecisionContext) -> Result<(), GuardrailRejection> {
        let cap = decision.budget_usd * self.max_fraction_of_remaining;
        if decision.cost_usd > cap {
            return Err(GuardrailRejection {
                guardrail: self.name().to_string(),
                reason: format!(
                    "action costs ${:.4}, above the ${:.4} power cap for this budget",
                    decision.cost_usd, cap
                ),
                recommendation: "reduce scope or request additional budget".to_string(),
            });
        }
        Ok(())
    }
}

/// Rejects actions proposed on a hard-vetoed (`BARK` at `q_score == 0`)
/// Judgment — alignment has already failed upstream, don't dispatch.
pub struct AlignmentChecker;

#[async_trait]
impl Guardrail for AlignmentChecker {
    fn name(&self) -> &str {
        "alignment_checker"
    }

    async fn check(&self, decision: &DecisionContext) -> Result<(), GuardrailRejection> {
        if decision.verdict == Verdict::Bark && decision.q_score == 0.0 {
            return Err(GuardrailRejection {
                guardrail: self.name().to_string(),
                reason: "judgment carries a hard veto (q_score == 0)".to_string(),
                recommendation: "do not dispatch; route to human review".to_string(),
            });
        }
        Ok(())
    }
}

/// Rejects when the action prompt is empty or otherwise not auditable —
/// every dispatched action must leave a legible trail.
pub struct TransparencyAudit;

#[async_trait]
impl Guardrail for TransparencyAudit {
    fn name(&self) -> &str {
        "transparency_audit"
    }

    async fn check(&self, decision: &DecisionContext) -> Result<(), GuardrailRejection> {
        if decision.action_prompt.trim().is_empty() {
            return Err(GuardrailRejection {
                guardrail: self.name().to_string(),
                reason: "action carries no auditable prompt".to_string(),
                recommendation: "attach a human-readable justification before dispatch".to_string(),
            });
        }
        Ok(())
    }
}

/// The last, most expensive link: realities carrying real-world
/// consequence (MARKET, SOLANA) above WAG require human sign-off before
/// dispatch. Everything else passes through automatically.
pub struct HumanApprovalGate {
    pub gated_realities: Vec<Reality>,
}

impl Default for HumanApprovalGate {
    fn default() -> Self {
        Self {
            gated_realities: vec![Reality::Market, Reality::Solana],
        }
    }
}

#[async_trait]
impl Guardrail for HumanApprovalGate {
    fn name(&self) -> &str {
        "human_approval_gate"
    }

    async fn check(&self, decision: &DecisionContext) -> Result<(), GuardrailRejection> {
        let needs_human = self.gated_realities.contains(&decision.reality)
            && matches!(decision.verdict, Verdict::Wag | Verdict::Howl);
        if needs_human {
            return Err(GuardrailRejection {
                guardrail: self.name().to_string(),
                reason: format!("{:?} actions at {:?} require human sign-off", decision.reality, decision.verdict),
                recommendation: "queue for human approval via the action proposer".to_string(),
            });
        }
        Ok(())
    }
}

/// The fixed, ordered chain: cheap rule-based checks first, human gate
/// last. A decision that clears every link is dispatch-ready.
pub struct GuardrailChain {
    guardrails: Vec<Box<dyn Guardrail>>,
}

impl GuardrailChain {
    pub fn standard() -> Self {
        Self {
            guardrails: vec![
                Box::new(PowerLimiter::default()),
                Box::new(AlignmentChecker),
                Box::new(TransparencyAudit),
                Box::new(HumanApprovalGate::default()),
            ],
        }
    }

    /// Run the chain in order, short-circuiting on the first rejection.
    /// The rejection is always returned for audit regardless of outcome.
    pub async fn evaluate(&self, decision: &DecisionContext) -> Result<(), GuardrailRejection> {
        for guardrail in &self.guardrails {
            guardrail.check(decision).await?;
        }
        Ok(())
    }
}

impl Default for GuardrailChain {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(verdict: Verdict, reality: Reality, q_score: f64) -> DecisionContext {
        DecisionContext {
            verdict,
            reality,
            q_score,
            budget_usd: 1.0,
            cost_usd: 0.1,
            action_prompt: "investigate the flagged module".to_string(),
        }
    }

    #[tokio::test]
    async fn clean_decision_clears_the_whole_chain() {
        let chain = GuardrailChain::standard();
        let result = chain.evaluate(&decision(Verdict::Growl, Reality::Code, 50.0)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn hard_veto_is_blocked_by_alignment_checker() {
        let chain = GuardrailChain::standard();
        let result = chain.evaluate(&decision(Verdict::Bark, Reality::Code, 0.0)).await;
        let err = result.unwrap_err();
        assert_eq!(err.guardrail, "alignment_checker");
    }

    #[tokio::test]
    async fn market_actions_above_wag_need_human_approval() {
        let chain = GuardrailChain::standard();
        let result = chain.evaluate(&decision(Verdict::Howl, Reality::Market, 90.0)).await;
        let err = result.unwrap_err();
        assert_eq!(err.guardrail, "human_approval_gate");
    }

    #[tokio::test]
    async fn power_limiter_runs_before_human_gate() {
        let chain = GuardrailChain::standard();
        let mut over_budget = decision(Verdict::Howl, Reality::Market, 90.0);
        over_budget.cost_usd = 10.0;
        let err = chain.evaluate(&over_budget).await.unwrap_err();
        assert_eq!(err.guardrail, "power_limiter");
    }
}
