// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! DogVote — one judge's opinion on one Cell.

use serde::{Deserialize, Serialize};

use crate::domain::cell::CellId;
use crate::domain::constants::{clamp_confidence, clamp_q_score};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JudgeId(pub String);

impl std::fmt::Display for JudgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JudgeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One judge's opinion on one Cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DogVote {
    pub judge_id: JudgeId,
    pub cell_id: CellId,
    pub q_score: f64,
    pub confidence: f64,
    /// Only the guardian judge may set this; see §4.2.
    pub veto: bool,
    pub reasoning: String,
    pub latency_ms: u64,
    pub cost_usd: f64,
    pub llm_id: Option<String>,
}

impl DogVote {
    pub fn new(judge_id: JudgeId, cell_id: CellId, q_score: f64, confidence: f64) -> Self {
        Self {
            judge_id,
            cell_id,
            q_score: clamp_q_score(q_score),
            confidence: clamp_confidence(confidence),
            veto: false,
            reasoning: String::new(),
            latency_ms: 0,
            cost_usd: 0.0,
            llm_id: None,
        }
    }

    pub fn with_veto(mut self, veto: bool) -> Self {
        self.veto = veto;
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_timing(mut self, latency_ms: u64, cost_usd: f64) -> Self {
        self.latency_ms = latency_ms;
        self.cost_usd = cost_usd;
        self
    }

    pub fn with_llm(mut self, llm_id: impl Into<String>) -> Self {
        self.llm_id = Some(llm_id.into());
        self
    }
}
