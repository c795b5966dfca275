// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory implementations of the §6 collaborator traits. These back the
//! kernel's own tests and give a caller that has not wired a real backend
//! yet something that works out of the box.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::action::{ActionId, ProposedAction};
use crate::domain::collaborators::{
    ActionProposalRepository, JudgmentRepository, LearningRepository, QTableRepository,
    ScholarRepository, Storage, StorageError,
};
use crate::domain::judgment::{Judgment, JudgmentId};
use crate::domain::qtable::{QEntry, QKey};
use crate::domain::residual::ResidualPoint;

#[derive(Default)]
pub struct InMemoryJudgmentRepository {
    judgments: Mutex<Vec<Judgment>>,
}

#[async_trait]
impl JudgmentRepository for InMemoryJudgmentRepository {
    async fn save(&self, judgment: &Judgment) -> Result<(), StorageError> {
        let mut judgments = self.judgments.lock();
        if let Some(existing) = judgments
            .iter_mut()
            .find(|j| j.judgment_id == judgment.judgment_id)
        {
            *existing = judgment.clone();
        } else {
            judgments.push(judgment.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: JudgmentId) -> Result<Option<Judgment>, StorageError> {
        Ok(self
            .judgments
            .lock()
            .iter()
            .find(|j| j.judgment_id == id)
            .cloned())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<Judgment>, StorageError> {
        let judgments = self.judgments.lock();
        Ok(judgments.iter().rev().take(limit).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryQTableRepository {
    entries: Mutex<HashMap<QKey, QEntry>>,
}

#[async_trait]
impl QTableRepository for InMemoryQTableRepository {
    async fn save_batch(&self, entries: &[(QKey, QEntry)]) -> Result<(), StorageError> {
        let mut table = self.entries.lock();
        for (key, entry) in entries {
            table.insert(key.clone(), entry.clone());
        }
        Ok(())
    }

    async fn load(&self, key: &QKey) -> Result<Option<QEntry>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn load_all(&self) -> Result<Vec<(QKey, QEntry)>, StorageError> {
        Ok(self
            .entries
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

struct RawLearningEvent {
    state_key: String,
    action: String,
    reward: f64,
    judgment_id: Option<JudgmentId>,
}

#[derive(Default)]
pub struct InMemoryLearningRepository {
    events: Mutex<Vec<RawLearningEvent>>,
}

#[async_trait]
impl LearningRepository for InMemoryLearningRepository {
    async fn record(
        &self,
        state_key: &str,
        action: &str,
        reward: f64,
        judgment_id: Option<JudgmentId>,
    ) -> Result<(), StorageError> {
        self.events.lock().push(RawLearningEvent {
            state_key: state_key.to_string(),
            action: action.to_string(),
            reward,
            judgment_id,
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryResidualRepository {
    points: Mutex<Vec<ResidualPoint>>,
}

#[async_trait]
impl ResidualRepository for InMemoryResidualRepository {
    async fn save(&self, point: &ResidualPoint) -> Result<(), StorageError> {
        self.points.lock().push(point.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ResidualPoint>, StorageError> {
        let points = self.points.lock();
        Ok(points.iter().rev().take(limit).cloned().collect())
    }
}

use crate::domain::collaborators::ResidualRepository;

/// Scholar's read-only similarity lookup, backed by nothing but the
/// learning repository's own keys: without a real embedding index this
/// just returns entries sharing the same `state_key` prefix up to the
/// reality segment, which is enough for the Scholar judge to blend a
/// "have I seen this before" signal (§9 cyclic-reference note).
#[derive(Default)]
pub struct InMemoryScholarRepository {
    seen: Mutex<Vec<QKey>>,
}

impl InMemoryScholarRepository {
    pub fn record(&self, key: QKey) {
        let mut seen = self.seen.lock();
        if !seen.contains(&key) {
            seen.push(key);
        }
    }
}

#[async_trait]
impl ScholarRepository for InMemoryScholarRepository {
    async fn similar(&self, state_key: &str, limit: usize) -> Result<Vec<QKey>, StorageError> {
        let reality = state_key.split(':').next().unwrap_or(state_key);
        Ok(self
            .seen
            .lock()
            .iter()
            .filter(|k| k.state_key.starts_with(reality))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryActionProposalRepository {
    actions: Mutex<Vec<ProposedAction>>,
}

#[async_trait]
impl ActionProposalRepository for InMemoryActionProposalRepository {
    async fn save(&self, action: &ProposedAction) -> Result<(), StorageError> {
        let mut actions = self.actions.lock();
        if let Some(existing) = actions
            .iter_mut()
            .find(|a| a.action_id == action.action_id)
        {
            *existing = action.clone();
        } else {
            actions.push(action.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: ActionId) -> Result<Option<ProposedAction>, StorageError> {
        Ok(self
            .actions
            .lock()
            .iter()
            .find(|a| a.action_id == id)
            .cloned())
    }

    async fn pending(&self, limit: usize) -> Result<Vec<ProposedAction>, StorageError> {
        use crate::domain::action::ActionStatus;
        let mut pending: Vec<ProposedAction> = self
            .actions
            .lock()
            .iter()
            .filter(|a| a.status == ActionStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.proposed_at.cmp(&b.proposed_at))
        });
        pending.truncate(limit);
        Ok(pending)
    }
}

/// Build a fully in-memory [`Storage`] aggregate, suitable for tests and
/// for running the kernel before a real persistence backend is wired in.
pub struct InMemoryStorage;

impl InMemoryStorage {
    pub fn new_storage() -> Arc<Storage> {
        Arc::new(Storage {
            judgments: Arc::new(InMemoryJudgmentRepository::default()),
            qtable: Arc::new(InMemoryQTableRepository::default()),
            learning: Arc::new(InMemoryLearningRepository::default()),
            residuals: Arc::new(InMemoryResidualRepository::default()),
            scholar: Arc::new(InMemoryScholarRepository::default()),
            action_proposals: Arc::new(InMemoryActionProposalRepository::default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::{CellId, Reality};
    use crate::domain::judgment::Verdict;

    #[tokio::test]
    async fn judgment_save_is_idempotent_on_id() {
        let repo = InMemoryJudgmentRepository::default();
        let judgment = crate::domain::judgment::JudgmentBuilder::new(
            CellId::new(),
            "code:judge:present:0",
            Reality::Code,
            crate::domain::tier::Tier::Micro,
        )
        .scores(70.0, 0.5)
        .build();

        repo.save(&judgment).await.unwrap();
        repo.save(&judgment).await.unwrap();

        let found = repo.find_by_id(judgment.judgment_id).await.unwrap().unwrap();
        assert_eq!(found.verdict, Verdict::Wag);
        assert_eq!(repo.find_recent(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn action_pending_orders_by_priority_then_time() {
        use crate::domain::action::ActionType;
        use crate::domain::judgment::JudgmentId;

        let repo = InMemoryActionProposalRepository::default();
        let low_priority = ProposedAction::new(
            JudgmentId::new(),
            "s",
            Verdict::Growl,
            Reality::Market,
            ActionType::Monitor,
            3,
            "watch it",
        );
        let high_priority = ProposedAction::new(
            JudgmentId::new(),
            "s",
            Verdict::Bark,
            Reality::Code,
            ActionType::Investigate,
            1,
            "look now",
        );
        repo.save(&low_priority).await.unwrap();
        repo.save(&high_priority).await.unwrap();

        let pending = repo.pending(10).await.unwrap();
        assert_eq!(pending[0].action_id, high_priority.action_id);
    }
}
