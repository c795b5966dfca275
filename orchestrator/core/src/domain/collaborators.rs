// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Collaborator interfaces (§6). These are the abstract seams the kernel
//! depends on but does not implement: persistence, LLM routing, action
//! execution and embeddings are out of the core's scope (§1) and are
//! expressed here as traits only. `infrastructure::memory` provides the
//! in-memory `Storage` implementation used by the kernel's own tests and by
//! callers that have not wired a real backend yet.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::action::{ActionId, ProposedAction};
use crate::domain::judgment::{Judgment, JudgmentId};
use crate::domain::qtable::{QEntry, QKey};
use crate::domain::residual::ResidualPoint;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Repository for Judgments. Saves are idempotent on `judgment_id`.
#[async_trait]
pub trait JudgmentRepository: Send + Sync {
    async fn save(&self, judgment: &Judgment) -> Result<(), StorageError>;
    async fn find_by_id(&self, id: JudgmentId) -> Result<Option<Judgment>, StorageError>;
    async fn find_recent(&self, limit: usize) -> Result<Vec<Judgment>, StorageError>;
}

/// Repository for Q-table entries. Saves are idempotent on `(state_key, action)`.
#[async_trait]
pub trait QTableRepository: Send + Sync {
    async fn save_batch(&self, entries: &[(QKey, QEntry)]) -> Result<(), StorageError>;
    async fn load(&self, key: &QKey) -> Result<Option<QEntry>, StorageError>;
    async fn load_all(&self) -> Result<Vec<(QKey, QEntry)>, StorageError>;
}

/// Repository for raw learning events, kept for audit/replay.
#[async_trait]
pub trait LearningRepository: Send + Sync {
    async fn record(
        &self,
        state_key: &str,
        action: &str,
        reward: f64,
        judgment_id: Option<JudgmentId>,
    ) -> Result<(), StorageError>;
}

/// Repository for residual observations.
#[async_trait]
pub trait ResidualRepository: Send + Sync {
    async fn save(&self, point: &ResidualPoint) -> Result<(), StorageError>;
    async fn recent(&self, limit: usize) -> Result<Vec<ResidualPoint>, StorageError>;
}

/// Repository the retrieval judge ("Scholar") reads to find similar past
/// cases. Read-only from the judge's perspective; see §9 on breaking the
/// Scholar/Q-table cycle.
#[async_trait]
pub trait ScholarRepository: Send + Sync {
    async fn similar(&self, state_key: &str, limit: usize) -> Result<Vec<QKey>, StorageError>;
}

/// Repository for proposed actions.
#[async_trait]
pub trait ActionProposalRepository: Send + Sync {
    async fn save(&self, action: &ProposedAction) -> Result<(), StorageError>;
    async fn find_by_id(&self, id: ActionId) -> Result<Option<ProposedAction>, StorageError>;
    async fn pending(&self, limit: usize) -> Result<Vec<ProposedAction>, StorageError>;
}

/// Aggregate handle bundling every repository the kernel needs. Passed by
/// explicit reference at construction time; there are no free-standing
/// globals (§9).
pub struct Storage {
    pub judgments: std::sync::Arc<dyn JudgmentRepository>,
    pub qtable: std::sync::Arc<dyn QTableRepository>,
    pub learning: std::sync::Arc<dyn LearningRepository>,
    pub residuals: std::sync::Arc<dyn ResidualRepository>,
    pub scholar: std::sync::Arc<dyn ScholarRepository>,
    pub action_proposals: std::sync::Arc<dyn ActionProposalRepository>,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no adapter available for judge {judge} task {task}")]
    NoAdapter { judge: String, task: String },

    #[error("adapter call failed: {0}")]
    AdapterFailed(String),
}

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub tokens: u32,
}

/// An opaque LLM adapter. Concrete providers (Anthropic, OpenAI, Ollama,
/// ...) live outside the core per §1.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;
}

/// Routes a judge/task pair to the best-performing adapter and records
/// outcomes to keep that routing decision current.
#[async_trait]
pub trait LlmRegistry: Send + Sync {
    async fn best_for(&self, judge: &str, task: &str) -> Result<std::sync::Arc<dyn LlmAdapter>, LlmError>;
    async fn update_benchmark(&self, judge: &str, task: &str, llm_id: &str, result_score: f64);
}

#[derive(Debug, Clone)]
pub struct RunnerOutcome {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

/// Dispatches an approved action to whatever executes it. The kernel only
/// decides and validates; it never carries out actions itself (§1).
#[async_trait]
pub trait Runner: Send + Sync {
    async fn execute(&self, prompt: &str, timeout_ms: u64) -> RunnerOutcome;
}

/// Embedding provider used by retrieval-backed judges.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;
    fn dimension(&self) -> usize;
    fn is_available(&self) -> bool;
}
