// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The uniform judge contract (§4.2, §9 "Judges as polymorphic uniform
//! contract"). Concrete judges — heuristic, LLM-backed, retrieval-backed,
//! predictor — all implement [`Judge`] so the panel can hold them as a
//! single `Vec<Arc<dyn Judge>>` and iterate uniformly.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::cell::{Cell, Reality};
use crate::domain::tier::Tier;
use crate::domain::vote::DogVote;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge timed out after {0}ms")]
    Timeout(u64),

    #[error("judge exceeded its cost cap: spent ${spent:.4} of ${cap:.4}")]
    CostExceeded { spent: f64, cap: f64 },

    #[error("judge execution failed: {0}")]
    ExecutionFailed(String),

    #[error("judge is unhealthy and was skipped")]
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeHealth {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct JudgeCapabilities {
    pub min_tier: Tier,
    pub uses_llm: bool,
    pub supported_realities: HashSet<Reality>,
    /// Reputation dimension score in `[0, 100]`; judges below 38.2 are
    /// skipped by the reputation filter (§4.2) unless they are the
    /// designated coordinator.
    pub reputation: f64,
    pub is_coordinator: bool,
    /// The one judge in the panel permitted to set `veto = true`.
    pub is_guardian: bool,
}

/// The uniform contract every specialist judge implements.
#[async_trait]
pub trait Judge: Send + Sync {
    fn judge_id(&self) -> &str;

    async fn analyze(
        &self,
        cell: &Cell,
        budget_usd: f64,
        context_hints: &[String],
    ) -> Result<DogVote, JudgeError>;

    async fn health(&self) -> JudgeHealth;

    fn capabilities(&self) -> JudgeCapabilities;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_round_trips_through_json() {
        let serialized = serde_json::to_string(&JudgeHealth::Degraded).unwrap();
        assert_eq!(serialized, "\"degraded\"");
        let back: JudgeHealth = serde_json::from_str(&serialized).unwrap();
        assert_eq!(back, JudgeHealth::Degraded);
    }
}
