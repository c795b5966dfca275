// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Consensus aggregator (C4) — PBFT-style quorum over a panel's surviving
//! votes, φ-weighted score fusion, and agreement-scaled confidence.

use crate::domain::constants::{clamp_confidence, clamp_q_score, MAX_CONFIDENCE, PHI};
use crate::domain::vote::DogVote;

/// `n >= 4: 2*floor((n-1)/3) + 1`, else `n` (fall back to unanimity).
pub fn compute_quorum(n: usize) -> usize {
    if n >= 4 {
        2 * ((n - 1) / 3) + 1
    } else {
        n
    }
}

#[derive(Debug, Clone)]
pub struct ConsensusOutcome {
    pub reached: bool,
    pub votes: usize,
    pub quorum: usize,
    pub q_score: f64,
    pub confidence: f64,
    pub residual_variance: f64,
}

pub struct ConsensusAggregator;

impl ConsensusAggregator {
    /// Fuse `votes` into a single outcome. `veto` forces `q_score = 0` and
    /// consensus failure regardless of vote count (§4.2, §4.3).
    pub fn aggregate(votes: &[DogVote], veto: bool) -> ConsensusOutcome {
        let n = votes.len();
        let quorum = compute_quorum(n);
        let reached = n >= quorum && !veto;

        if veto {
            return ConsensusOutcome {
                reached: false,
                votes: n,
                quorum,
                q_score: 0.0,
                confidence: 0.0,
                residual_variance: Self::residual_variance(votes),
            };
        }

        let q_score = Self::phi_weighted_geometric_mean(votes);
        let residual_variance = Self::residual_variance(votes);
        let mean_confidence = if n == 0 {
            0.0
        } else {
            votes.iter().map(|v| v.confidence).sum::<f64>() / n as f64
        };
        let agreement = (1.0 - residual_variance / 0.1).clamp(0.0, 1.0);
        let confidence = clamp_confidence((mean_confidence * agreement).min(MAX_CONFIDENCE));

        ConsensusOutcome {
            reached,
            votes: n,
            quorum,
            q_score: clamp_q_score(q_score),
            confidence,
            residual_variance,
        }
    }

    /// Weighted geometric mean of `q_score` across votes, weighted by each
    /// vote's confidence with a φ⁻¹-derived floor so a zero-confidence vote
    /// still contributes rather than collapsing the product.
    fn phi_weighted_geometric_mean(votes: &[DogVote]) -> f64 {
        if votes.is_empty() {
            return 0.0;
        }
        let weight_floor = 1.0 / PHI;
        let mut weighted_log_sum = 0.0;
        let mut weight_sum = 0.0;
        for vote in votes {
            let weight = vote.confidence.max(weight_floor * 0.1);
            let score = vote.q_score.max(0.0001);
            weighted_log_sum += weight * score.ln();
            weight_sum += weight;
        }
        if weight_sum <= 0.0 {
            return votes.iter().map(|v| v.q_score).sum::<f64>() / votes.len() as f64;
        }
        (weighted_log_sum / weight_sum).exp()
    }

    /// Population variance of `q_score / 100`, i.e. on the unit interval
    /// that `residual_variance` lives in.
    fn residual_variance(votes: &[DogVote]) -> f64 {
        if votes.len() < 2 {
            return 0.0;
        }
        let unit_scores: Vec<f64> = votes.iter().map(|v| v.q_score / 100.0).collect();
        let mean = unit_scores.iter().sum::<f64>() / unit_scores.len() as f64;
        let variance = unit_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / unit_scores.len() as f64;
        variance.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::CellId;

    fn vote(score: f64, confidence: f64) -> DogVote {
        DogVote::new("j".into(), CellId::new(), score, confidence)
    }

    #[test]
    fn quorum_matches_pbft_formula_for_large_panels() {
        assert_eq!(compute_quorum(4), 3);
        assert_eq!(compute_quorum(7), 5);
        assert_eq!(compute_quorum(10), 7);
    }

    #[test]
    fn quorum_falls_back_to_unanimity_below_four() {
        assert_eq!(compute_quorum(3), 3);
        assert_eq!(compute_quorum(1), 1);
    }

    #[test]
    fn veto_zeroes_score_and_blocks_consensus() {
        let votes = vec![vote(90.0, 0.6), vote(95.0, 0.6), vote(88.0, 0.6)];
        let outcome = ConsensusAggregator::aggregate(&votes, true);
        assert_eq!(outcome.q_score, 0.0);
        assert!(!outcome.reached);
    }

    #[test]
    fn confidence_never_exceeds_phi_inverse() {
        let votes = vec![vote(80.0, 0.618), vote(82.0, 0.618), vote(81.0, 0.618)];
        let outcome = ConsensusAggregator::aggregate(&votes, false);
        assert!(outcome.confidence <= MAX_CONFIDENCE);
    }

    #[test]
    fn high_disagreement_lowers_confidence() {
        let agreeing = vec![vote(80.0, 0.5), vote(81.0, 0.5), vote(79.0, 0.5)];
        let disagreeing = vec![vote(10.0, 0.5), vote(90.0, 0.5), vote(50.0, 0.5)];
        let agreeing_outcome = ConsensusAggregator::aggregate(&agreeing, false);
        let disagreeing_outcome = ConsensusAggregator::aggregate(&disagreeing, false);
        assert!(disagreeing_outcome.confidence < agreeing_outcome.confidence);
    }
}
