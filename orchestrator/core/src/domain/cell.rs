// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Cell
//!
//! A unit of perception awaiting judgment. Cells are immutable after
//! construction; ownership passes from producer to scheduler to worker
//! to, optionally, the learning loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::constants::clamp_unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId(pub Uuid);

impl CellId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which reality a perception originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reality {
    Code,
    Market,
    Social,
    Human,
    Cynic,
    Solana,
    Cosmos,
}

impl std::fmt::Display for Reality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Reality::Code => "code",
            Reality::Market => "market",
            Reality::Social => "social",
            Reality::Human => "human",
            Reality::Cynic => "cynic",
            Reality::Solana => "solana",
            Reality::Cosmos => "cosmos",
        };
        write!(f, "{s}")
    }
}

/// The cognitive stage of a pipeline; MACRO runs through all seven in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analysis {
    Perceive,
    Judge,
    Decide,
    Act,
    Learn,
    Account,
    Emerge,
}

impl std::fmt::Display for Analysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Analysis::Perceive => "perceive",
            Analysis::Judge => "judge",
            Analysis::Decide => "decide",
            Analysis::Act => "act",
            Analysis::Learn => "learn",
            Analysis::Account => "account",
            Analysis::Emerge => "emerge",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeDim {
    Past,
    Present,
    Future,
}

impl std::fmt::Display for TimeDim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimeDim::Past => "past",
            TimeDim::Present => "present",
            TimeDim::Future => "future",
        };
        write!(f, "{s}")
    }
}

/// Level of detail requested for a single Cell, 0 (coarsest) to 3 (finest).
/// Distinct from the kernel-wide self-throttle level in
/// [`crate::domain::tier::SystemLod`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DetailLevel(u8);

impl DetailLevel {
    pub fn new(level: u8) -> Self {
        Self(level.min(3))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of perception awaiting judgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub cell_id: CellId,
    pub reality: Reality,
    pub analysis: Analysis,
    pub time_dim: TimeDim,
    pub lod: DetailLevel,
    pub content: serde_json::Value,
    pub context: String,
    pub risk: f64,
    pub complexity: f64,
    pub budget_usd: f64,
    /// Hint in 0..=7 used by the fallback tier-selection rule (§4.7.5).
    pub consciousness: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    reality: Option<Reality>,
    analysis: Option<Analysis>,
    time_dim: Option<TimeDim>,
    lod: u8,
    content: serde_json::Value,
    context: String,
    risk: f64,
    complexity: f64,
    budget_usd: f64,
    consciousness: u8,
}

impl CellBuilder {
    pub fn new(reality: Reality, analysis: Analysis) -> Self {
        Self {
            reality: Some(reality),
            analysis: Some(analysis),
            content: serde_json::Value::Null,
            ..Default::default()
        }
    }

    pub fn time_dim(mut self, time_dim: TimeDim) -> Self {
        self.time_dim = Some(time_dim);
        self
    }

    pub fn lod(mut self, lod: u8) -> Self {
        self.lod = lod;
        self
    }

    pub fn content(mut self, content: serde_json::Value) -> Self {
        self.content = content;
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn risk(mut self, risk: f64) -> Self {
        self.risk = clamp_unit(risk);
        self
    }

    pub fn complexity(mut self, complexity: f64) -> Self {
        self.complexity = clamp_unit(complexity);
        self
    }

    pub fn budget_usd(mut self, budget_usd: f64) -> Self {
        self.budget_usd = budget_usd.max(0.0);
        self
    }

    pub fn consciousness(mut self, consciousness: u8) -> Self {
        self.consciousness = consciousness.min(7);
        self
    }

    pub fn build(self) -> Cell {
        Cell {
            cell_id: CellId::new(),
            reality: self.reality.expect("reality is required"),
            analysis: self.analysis.expect("analysis is required"),
            time_dim: self.time_dim.unwrap_or(TimeDim::Present),
            lod: DetailLevel::new(self.lod),
            content: self.content,
            context: self.context,
            risk: self.risk,
            complexity: self.complexity,
            budget_usd: self.budget_usd,
            consciousness: self.consciousness,
            created_at: Utc::now(),
        }
    }
}

impl Cell {
    /// Derived routing key: `reality:analysis:time_dim:lod`.
    pub fn state_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.reality, self.analysis, self.time_dim, self.lod
        )
    }

    /// A Cell is explicitly dangerous when risk is maxed and it requests
    /// an ACT analysis; the panel forces `q_score = 0` for these (§4.2).
    pub fn is_explicitly_dangerous(&self) -> bool {
        self.risk >= 1.0 && matches!(self.analysis, Analysis::Act)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_key_matches_spec_layout() {
        let cell = CellBuilder::new(Reality::Code, Analysis::Judge)
            .time_dim(TimeDim::Present)
            .lod(2)
            .build();
        assert_eq!(cell.state_key(), "code:judge:present:2");
    }

    #[test]
    fn risk_and_complexity_are_clamped() {
        let cell = CellBuilder::new(Reality::Market, Analysis::Decide)
            .risk(5.0)
            .complexity(-2.0)
            .build();
        assert_eq!(cell.risk, 1.0);
        assert_eq!(cell.complexity, 0.0);
    }

    #[test]
    fn explicit_danger_requires_both_risk_and_act() {
        let dangerous = CellBuilder::new(Reality::Code, Analysis::Act)
            .risk(1.0)
            .build();
        assert!(dangerous.is_explicitly_dangerous());

        let not_dangerous = CellBuilder::new(Reality::Code, Analysis::Judge)
            .risk(1.0)
            .build();
        assert!(!not_dangerous.is_explicitly_dangerous());
    }
}
