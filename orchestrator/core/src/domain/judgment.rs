// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Judgment — the fused outcome of a panel/consensus pass over one Cell.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cell::{CellId, Reality};
use crate::domain::constants::{clamp_confidence, clamp_q_score, clamp_unit, BARK_MAX, GROWL_MAX, MAX_CONFIDENCE, WAG_MAX};
use crate::domain::tier::Tier;
use crate::domain::vote::{DogVote, JudgeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JudgmentId(pub Uuid);

impl JudgmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JudgmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JudgmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Verdict derived from `q_score` by the fixed thresholds in §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Bark,
    Growl,
    Wag,
    Howl,
}

impl Verdict {
    /// `BARK` if <38.2, `GROWL` if <61.8, `WAG` if <82.0, else `HOWL`.
    pub fn from_q_score(q_score: f64) -> Self {
        if q_score < BARK_MAX {
            Verdict::Bark
        } else if q_score < GROWL_MAX {
            Verdict::Growl
        } else if q_score < WAG_MAX {
            Verdict::Wag
        } else {
            Verdict::Howl
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Bark => "bark",
            Verdict::Growl => "growl",
            Verdict::Wag => "wag",
            Verdict::Howl => "howl",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The fused outcome of a pipeline run over one Cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judgment {
    pub judgment_id: JudgmentId,
    pub cell_id: CellId,
    pub state_key: String,
    pub reality: Reality,
    pub q_score: f64,
    pub confidence: f64,
    pub verdict: Verdict,
    pub consensus_reached: bool,
    pub consensus_votes: usize,
    pub consensus_quorum: usize,
    pub residual_variance: f64,
    pub unnameable_detected: bool,
    pub axiom_scores: HashMap<String, f64>,
    pub dog_votes: HashMap<JudgeId, DogVote>,
    pub level_used: Tier,
    pub created_at: DateTime<Utc>,
}

pub struct JudgmentBuilder {
    cell_id: CellId,
    state_key: String,
    reality: Reality,
    q_score: f64,
    confidence: f64,
    consensus_reached: bool,
    consensus_votes: usize,
    consensus_quorum: usize,
    residual_variance: f64,
    axiom_scores: HashMap<String, f64>,
    dog_votes: HashMap<JudgeId, DogVote>,
    level_used: Tier,
}

impl JudgmentBuilder {
    pub fn new(cell_id: CellId, state_key: impl Into<String>, reality: Reality, level_used: Tier) -> Self {
        Self {
            cell_id,
            state_key: state_key.into(),
            reality,
            q_score: 0.0,
            confidence: 0.0,
            consensus_reached: false,
            consensus_votes: 0,
            consensus_quorum: 0,
            residual_variance: 0.0,
            axiom_scores: HashMap::new(),
            dog_votes: HashMap::new(),
            level_used,
        }
    }

    pub fn scores(mut self, q_score: f64, confidence: f64) -> Self {
        self.q_score = clamp_q_score(q_score);
        self.confidence = clamp_confidence(confidence.min(self.level_used.confidence_cap()));
        self
    }

    pub fn consensus(mut self, reached: bool, votes: usize, quorum: usize) -> Self {
        self.consensus_reached = reached;
        self.consensus_votes = votes;
        self.consensus_quorum = quorum;
        self
    }

    pub fn residual_variance(mut self, variance: f64) -> Self {
        self.residual_variance = clamp_unit(variance);
        self
    }

    pub fn axiom_scores(mut self, scores: HashMap<String, f64>) -> Self {
        self.axiom_scores = scores;
        self
    }

    pub fn dog_votes(mut self, votes: HashMap<JudgeId, DogVote>) -> Self {
        self.dog_votes = votes;
        self
    }

    pub fn build(self) -> Judgment {
        let unnameable_detected = self.residual_variance > MAX_CONFIDENCE;
        Judgment {
            judgment_id: JudgmentId::new(),
            cell_id: self.cell_id,
            state_key: self.state_key,
            reality: self.reality,
            q_score: self.q_score,
            confidence: self.confidence,
            verdict: Verdict::from_q_score(self.q_score),
            consensus_reached: self.consensus_reached,
            consensus_votes: self.consensus_votes,
            consensus_quorum: self.consensus_quorum,
            residual_variance: self.residual_variance,
            unnameable_detected,
            axiom_scores: self.axiom_scores,
            dog_votes: self.dog_votes,
            level_used: self.level_used,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_thresholds_are_exact() {
        assert_eq!(Verdict::from_q_score(0.0), Verdict::Bark);
        assert_eq!(Verdict::from_q_score(38.1999), Verdict::Bark);
        assert_eq!(Verdict::from_q_score(38.2), Verdict::Growl);
        assert_eq!(Verdict::from_q_score(61.7999), Verdict::Growl);
        assert_eq!(Verdict::from_q_score(61.8), Verdict::Wag);
        assert_eq!(Verdict::from_q_score(81.9999), Verdict::Wag);
        assert_eq!(Verdict::from_q_score(82.0), Verdict::Howl);
        assert_eq!(Verdict::from_q_score(100.0), Verdict::Howl);
    }

    #[test]
    fn unnameable_flag_matches_residual_bound() {
        let j = JudgmentBuilder::new(CellId::new(), "k", Reality::Code, Tier::Micro)
            .residual_variance(0.619)
            .build();
        assert!(j.unnameable_detected);

        let j2 = JudgmentBuilder::new(CellId::new(), "k", Reality::Code, Tier::Micro)
            .residual_variance(0.618)
            .build();
        assert!(!j2.unnameable_detected);
    }

    #[test]
    fn confidence_is_capped_by_tier() {
        let j = JudgmentBuilder::new(CellId::new(), "k", Reality::Code, Tier::Reflex)
            .scores(90.0, 0.9)
            .build();
        assert!(j.confidence <= crate::domain::constants::PHI_INV2);
    }
}
