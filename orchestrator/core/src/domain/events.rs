// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The closed event vocabulary (§6). Every inter-component signal in the
//! kernel is one variant of [`KernelEvent`]; adding an event means touching
//! this one file, which is a feature (§9 "Dynamic handler registry -> closed
//! event enum").

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::action::ActionType;
use crate::domain::cell::{CellId, Reality};
use crate::domain::judgment::{JudgmentId, Verdict};
use crate::domain::residual::EmergencePattern;
use crate::domain::tier::{SystemLod, Tier};
use crate::domain::vote::DogVote;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelEvent {
    PerceptionReceived {
        cell_id: CellId,
        reality: Reality,
        source: Option<String>,
        data: Option<serde_json::Value>,
    },
    JudgmentRequested {
        cell_id: CellId,
        reality: Reality,
        level: Tier,
    },
    JudgmentCreated {
        judgment_id: JudgmentId,
        cell_id: CellId,
        state_key: String,
        reality: Reality,
        verdict: Verdict,
        q_score: f64,
        confidence: f64,
        residual_variance: f64,
        dog_votes: HashMap<String, DogVote>,
        level_used: Tier,
    },
    JudgmentFailed {
        cell_id: CellId,
        error: String,
        circuit_state: Option<String>,
        failure_count: Option<u32>,
    },
    ConsensusReached {
        judgment_id: JudgmentId,
        votes: usize,
        quorum: usize,
        residual_variance: Option<f64>,
    },
    ConsensusFailed {
        judgment_id: JudgmentId,
        votes: usize,
        quorum: usize,
        residual_variance: Option<f64>,
    },
    LearningEvent {
        state_key: String,
        action: String,
        reward: f64,
        judgment_id: Option<JudgmentId>,
        loop_name: String,
    },
    QTableUpdated {
        flushed: usize,
        total_entries: usize,
        ewc_consolidated: usize,
        total_updates: u64,
    },
    EwcCheckpoint {
        state_key: String,
        action: String,
        q_value: f64,
    },
    ResidualHigh {
        judgment_id: JudgmentId,
        residual_variance: f64,
        cell_id: CellId,
    },
    EmergenceDetected {
        pattern_type: EmergencePattern,
        severity: f64,
        evidence: Vec<f64>,
    },
    DecisionMade {
        verdict: Verdict,
        reality: Reality,
        state_key: String,
        q_value: f64,
        action_prompt: Option<String>,
        judgment_id: JudgmentId,
    },
    ActRequested {
        action_id: crate::domain::action::ActionId,
        action_type: ActionType,
        reality: Reality,
    },
    ActCompleted {
        action_id: crate::domain::action::ActionId,
        success: bool,
        duration_ms: u64,
        error: Option<String>,
    },
    BudgetWarning {
        cell_id: CellId,
        remaining_usd: f64,
    },
    BudgetExhausted {
        cell_id: CellId,
    },
    CostAccounted {
        cell_id: CellId,
        judgment_id: JudgmentId,
        cost_usd: f64,
    },
    ConsciousnessChanged {
        from: SystemLod,
        to: SystemLod,
        direction: LodDirection,
    },
    MetaCycle {
        pass_rate: f64,
        regression: bool,
        results: Vec<MetaProbeResult>,
    },
    UserFeedback {
        rating: u8,
        state_key: String,
        action: String,
        judgment_id: JudgmentId,
    },
    UserCorrection {
        rating: u8,
        state_key: String,
        action: String,
        judgment_id: JudgmentId,
    },
    DiskPressure {
        used_pct: f64,
        pressure: SystemLod,
    },
    MemoryPressure {
        used_pct: f64,
        pressure: SystemLod,
    },
}

impl KernelEvent {
    /// Stable name used for metrics labels and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            KernelEvent::PerceptionReceived { .. } => "perception_received",
            KernelEvent::JudgmentRequested { .. } => "judgment_requested",
            KernelEvent::JudgmentCreated { .. } => "judgment_created",
            KernelEvent::JudgmentFailed { .. } => "judgment_failed",
            KernelEvent::ConsensusReached { .. } => "consensus_reached",
            KernelEvent::ConsensusFailed { .. } => "consensus_failed",
            KernelEvent::LearningEvent { .. } => "learning_event",
            KernelEvent::QTableUpdated { .. } => "q_table_updated",
            KernelEvent::EwcCheckpoint { .. } => "ewc_checkpoint",
            KernelEvent::ResidualHigh { .. } => "residual_high",
            KernelEvent::EmergenceDetected { .. } => "emergence_detected",
            KernelEvent::DecisionMade { .. } => "decision_made",
            KernelEvent::ActRequested { .. } => "act_requested",
            KernelEvent::ActCompleted { .. } => "act_completed",
            KernelEvent::BudgetWarning { .. } => "budget_warning",
            KernelEvent::BudgetExhausted { .. } => "budget_exhausted",
            KernelEvent::CostAccounted { .. } => "cost_accounted",
            KernelEvent::ConsciousnessChanged { .. } => "consciousness_changed",
            KernelEvent::MetaCycle { .. } => "meta_cycle",
            KernelEvent::UserFeedback { .. } => "user_feedback",
            KernelEvent::UserCorrection { .. } => "user_correction",
            KernelEvent::DiskPressure { .. } => "disk_pressure",
            KernelEvent::MemoryPressure { .. } => "memory_pressure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LodDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaProbeResult {
    pub probe_id: String,
    pub expected_min: f64,
    pub expected_max: f64,
    pub observed: f64,
    pub passed: bool,
    pub ran_at: DateTime<Utc>,
}
