// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! ResidualPoint and the emergence patterns the residual detector classifies
//! its ring buffer into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::cell::Reality;
use crate::domain::constants::MAX_CONFIDENCE;
use crate::domain::judgment::JudgmentId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualPoint {
    pub judgment_id: JudgmentId,
    pub residual_variance: f64,
    pub reality: Reality,
    pub observed_at: DateTime<Utc>,
    pub unnameable: bool,
}

impl ResidualPoint {
    pub fn new(judgment_id: JudgmentId, residual_variance: f64, reality: Reality) -> Self {
        Self {
            judgment_id,
            residual_variance,
            reality,
            observed_at: Utc::now(),
            unnameable: residual_variance > MAX_CONFIDENCE,
        }
    }
}

/// An emergence pattern classified across the residual detector's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencePattern {
    Spike,
    Rising,
    StableHigh,
}

impl std::fmt::Display for EmergencePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EmergencePattern::Spike => "spike",
            EmergencePattern::Rising => "rising",
            EmergencePattern::StableHigh => "stable_high",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergenceDetection {
    pub pattern: EmergencePattern,
    pub severity: f64,
    pub evidence: Vec<f64>,
}
