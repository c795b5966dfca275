// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Action proposer (C13) — subscribes to `DECISION_MADE`, classifies each
//! decision into a `(action_type, priority)` via the fixed §4.13 table,
//! and maintains a rolling 89-cap queue. Accept/reject mutations persist
//! atomically and rejection emits a negative-reward `LEARNING_EVENT`.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::action::{classify, ActionId, ActionStatus, ProposedAction};
use crate::domain::collaborators::Storage;
use crate::domain::constants::ACTION_QUEUE_CAP;
use crate::domain::events::KernelEvent;
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Error)]
pub enum ActionProposerError {
    #[error("action {0:?} not found")]
    NotFound(ActionId),

    #[error("action {0:?} is not pending (already {1:?})")]
    NotPending(ActionId, ActionStatus),

    #[error("storage error: {0}")]
    Storage(#[from] crate::domain::collaborators::StorageError),
}

pub struct ActionProposer {
    storage: Arc<Storage>,
    bus: EventBus,
}

impl ActionProposer {
    pub fn new(storage: Arc<Storage>, bus: EventBus) -> Arc<Self> {
        Arc::new(Self { storage, bus })
    }

    /// Classify a `DECISION_MADE` payload and persist it as a new
    /// `ProposedAction`, enforcing the rolling 89-cap by dropping the
    /// oldest pending entry when full.
    pub async fn propose(
        &self,
        judgment_id: crate::domain::judgment::JudgmentId,
        state_key: &str,
        verdict: crate::domain::judgment::Verdict,
        reality: crate::domain::cell::Reality,
        action_prompt: Option<String>,
    ) -> Option<ProposedAction> {
        let (action_type, priority) = classify(verdict, reality)?;
        let action = ProposedAction::new(
            judgment_id,
            state_key,
            verdict,
            reality,
            action_type,
            priority,
            action_prompt.unwrap_or_default(),
        );

        self.enforce_cap().await;

        if let Err(err) = self.storage.action_proposals.save(&action).await {
            warn!(error = %err, "failed to persist proposed action");
            return None;
        }

        self.bus.publish(KernelEvent::ActRequested {
            action_id: action.action_id,
            action_type,
            reality,
        });

        Some(action)
    }

    async fn enforce_cap(&self) {
        if let Ok(pending) = self.storage.action_proposals.pending(usize::MAX).await {
            if pending.len() >= ACTION_QUEUE_CAP {
                if let Some(oldest) = pending.last() {
                    let mut dropped = oldest.clone();
                    dropped.status = ActionStatus::Rejected;
                    let _ = self.storage.action_proposals.save(&dropped).await;
                }
            }
        }
    }

    /// The queue as the caller should see it: pending, ordered by
    /// `(priority asc, proposed_at asc)` (§4.13).
    pub async fn pending(&self, limit: usize) -> Result<Vec<ProposedAction>, ActionProposerError> {
        Ok(self.storage.action_proposals.pending(limit).await?)
    }

    pub async fn accept(&self, action_id: ActionId) -> Result<ProposedAction, ActionProposerError> {
        self.transition(action_id, ActionStatus::Accepted).await
    }

    /// Reject a pending action. Emits a negative-reward `LEARNING_EVENT`
    /// so the Q-table learns that this state/action pairing was unwanted.
    pub async fn reject(&self, action_id: ActionId) -> Result<ProposedAction, ActionProposerError> {
        let action = self.transition(action_id, ActionStatus::Rejected).await?;
        self.bus.publish(KernelEvent::LearningEvent {
            state_key: action.state_key.clone(),
            action: action.verdict.as_str().to_string(),
            reward: 0.0,
            judgment_id: Some(action.judgment_id),
            loop_name: "action_proposer_rejection".to_string(),
        });
        Ok(action)
    }

    async fn transition(
        &self,
        action_id: ActionId,
        to: ActionStatus,
    ) -> Result<ProposedAction, ActionProposerError> {
        let mut action = self
            .storage
            .action_proposals
            .find_by_id(action_id)
            .await?
            .ok_or(ActionProposerError::NotFound(action_id))?;

        if action.status != ActionStatus::Pending {
            return Err(ActionProposerError::NotPending(action_id, action.status));
        }

        action.status = to;
        self.storage.action_proposals.save(&action).await?;
        info!(?action_id, ?to, "proposed action transitioned");
        Ok(action)
    }

    /// Spawn the background task subscribing to `DECISION_MADE`.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let mut receiver = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = receiver.recv() => {
                        match event {
                            Ok(KernelEvent::DecisionMade { verdict, reality, state_key, judgment_id, action_prompt, .. }) => {
                                self.propose(judgment_id, &state_key, verdict, reality, action_prompt).await;
                            }
                            Ok(_) => {}
                            Err(crate::infrastructure::event_bus::EventBusError::Closed) => break,
                            Err(_) => continue,
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::Reality;
    use crate::domain::judgment::{JudgmentId, Verdict};
    use crate::infrastructure::memory::InMemoryStorage;

    #[tokio::test]
    async fn bark_on_code_becomes_investigate_priority_one() {
        let proposer = ActionProposer::new(InMemoryStorage::new_storage(), EventBus::with_default_capacity());
        let action = proposer
            .propose(JudgmentId::new(), "code:judge:present:0", Verdict::Bark, Reality::Code, None)
            .await
            .unwrap();
        assert_eq!(action.priority, 1);
    }

    #[tokio::test]
    async fn wag_verdicts_are_not_actioned() {
        let proposer = ActionProposer::new(InMemoryStorage::new_storage(), EventBus::with_default_capacity());
        let action = proposer
            .propose(JudgmentId::new(), "code:judge:present:0", Verdict::Wag, Reality::Code, None)
            .await;
        assert!(action.is_none());
    }

    #[tokio::test]
    async fn reject_emits_negative_learning_event() {
        let bus = EventBus::with_default_capacity();
        let mut receiver = bus.subscribe();
        let proposer = ActionProposer::new(InMemoryStorage::new_storage(), bus);
        let action = proposer
            .propose(JudgmentId::new(), "code:judge:present:0", Verdict::Bark, Reality::Code, None)
            .await
            .unwrap();

        proposer.reject(action.action_id).await.unwrap();

        let mut saw_negative_reward = false;
        while let Ok(event) = receiver.try_recv() {
            if let KernelEvent::LearningEvent { reward, .. } = event {
                saw_negative_reward = reward == 0.0;
            }
        }
        assert!(saw_negative_reward);
    }

    #[tokio::test]
    async fn cannot_accept_an_already_rejected_action() {
        let proposer = ActionProposer::new(InMemoryStorage::new_storage(), EventBus::with_default_capacity());
        let action = proposer
            .propose(JudgmentId::new(), "code:judge:present:0", Verdict::Bark, Reality::Code, None)
            .await
            .unwrap();
        proposer.reject(action.action_id).await.unwrap();
        let result = proposer.accept(action.action_id).await;
        assert!(matches!(result, Err(ActionProposerError::NotPending(_, _))));
    }
}
