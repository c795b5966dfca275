// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Q-table + learning loop (C5) — subscribes to `LEARNING_EVENT`, applies
//! the TD(0)/EWC update, and flushes dirty entries in batches of
//! [`FLUSH_BATCH`]. Also hosts the two action-selection policies used by
//! the DECIDE step of the tier orchestrator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::collaborators::Storage;
use crate::domain::config::LearningConfig;
use crate::domain::events::KernelEvent;
use crate::domain::qtable::{QEntry, QKey};
use crate::infrastructure::event_bus::EventBus;

/// The action the learning loop defaults an unseen state to (§4.5).
pub const CAUTIOUS_DEFAULT_ACTION: &str = "growl";

#[derive(Debug, Clone, Copy, Default)]
pub struct LearningStats {
    pub states: usize,
    pub total_updates: u64,
    pub pending_flush: usize,
    pub max_confidence: f64,
    pub unique_states: usize,
}

pub struct LearningLoop {
    table: DashMap<QKey, QEntry>,
    total_updates: AtomicU64,
    storage: Arc<Storage>,
    bus: EventBus,
    config: LearningConfig,
}

impl LearningLoop {
    pub fn new(storage: Arc<Storage>, bus: EventBus) -> Arc<Self> {
        Self::with_config(storage, bus, LearningConfig::default())
    }

    /// Build with an explicit [`LearningConfig`], honoring the §6 config
    /// surface's `learning.alpha` / `.ewc_threshold` / `.flush_batch`
    /// overrides instead of the hardcoded defaults.
    pub fn with_config(storage: Arc<Storage>, bus: EventBus, config: LearningConfig) -> Arc<Self> {
        Arc::new(Self {
            table: DashMap::new(),
            total_updates: AtomicU64::new(0),
            storage,
            bus,
            config,
        })
    }

    /// Restore previously persisted entries at boot.
    pub async fn hydrate(&self) -> Result<(), crate::domain::collaborators::StorageError> {
        for (key, entry) in self.storage.qtable.load_all().await? {
            self.table.insert(key, entry);
        }
        Ok(())
    }

    /// Apply one reward to `(state_key, action)`, flushing every
    /// [`FLUSH_BATCH`] updates.
    pub async fn apply(&self, state_key: &str, action: &str, reward: f64, judgment_id: Option<crate::domain::judgment::JudgmentId>) {
        let key = QKey::new(state_key, action);
        let outcome = {
            let mut entry = self.table.entry(key.clone()).or_default();
            entry.apply_reward_with(reward, self.config.alpha, self.config.ewc_threshold)
        };

        if outcome.just_consolidated {
            if let Some(entry) = self.table.get(&key) {
                self.bus.publish(KernelEvent::EwcCheckpoint {
                    state_key: key.state_key.clone(),
                    action: key.action.clone(),
                    q_value: entry.q_value,
                });
            }
        }

        if let Err(err) = self
            .storage
            .learning
            .record(state_key, action, reward, judgment_id)
            .await
        {
            warn!(error = %err, "failed to record raw learning event");
        }

        let total = self.total_updates.fetch_add(1, Ordering::SeqCst) + 1;
        if total % self.config.flush_batch.max(1) as u64 == 0 {
            self.flush().await;
        }
    }

    /// Flush every dirty entry, clearing the dirty flag on success.
    pub async fn flush(&self) {
        let dirty: Vec<(QKey, QEntry)> = self
            .table
            .iter()
            .filter(|entry| entry.value().dirty)
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        if dirty.is_empty() {
            return;
        }

        match self.storage.qtable.save_batch(&dirty).await {
            Ok(()) => {
                for (key, _) in &dirty {
                    if let Some(mut entry) = self.table.get_mut(key) {
                        entry.dirty = false;
                    }
                }
                let consolidated = self.table.iter().filter(|e| e.value().consolidated).count();
                self.bus.publish(KernelEvent::QTableUpdated {
                    flushed: dirty.len(),
                    total_entries: self.table.len(),
                    ewc_consolidated: consolidated,
                    total_updates: self.total_updates.load(Ordering::SeqCst),
                });
            }
            Err(err) => {
                metrics::counter!("aegis_qtable_flush_failed_total").increment(1);
                warn!(error = %err, "q-table flush failed, entries remain dirty");
            }
        }
    }

    /// Exploit policy: argmax `q_value` over `actions`. Falls back to the
    /// cautious default when the state has no entries at all.
    pub fn exploit(&self, state_key: &str, actions: &[&str]) -> String {
        let mut best: Option<(&str, f64)> = None;
        for action in actions {
            let key = QKey::new(state_key, *action);
            let q_value = self.table.get(&key).map(|e| e.q_value).unwrap_or(0.0);
            if best.map(|(_, v)| q_value > v).unwrap_or(true) {
                best = Some((action, q_value));
            }
        }
        best.map(|(a, _)| a.to_string())
            .unwrap_or_else(|| CAUTIOUS_DEFAULT_ACTION.to_string())
    }

    /// Explore policy: Thompson-style sampling using `(wins + 1, losses + 1)`
    /// as a Beta-prior proxy seeded by visit counts.
    pub fn explore(&self, state_key: &str, actions: &[&str]) -> String {
        if actions.is_empty() {
            return CAUTIOUS_DEFAULT_ACTION.to_string();
        }
        let mut rng = rand::rng();
        let mut best: Option<(&str, f64)> = None;
        for action in actions {
            let key = QKey::new(state_key, *action);
            let (wins, losses) = self
                .table
                .get(&key)
                .map(|e| (e.wins, e.losses))
                .unwrap_or((0, 0));
            // Approximate a Beta(wins+1, losses+1) draw with a bounded
            // uniform jitter around the empirical win rate.
            let alpha = wins as f64 + 1.0;
            let beta = losses as f64 + 1.0;
            let mean = alpha / (alpha + beta);
            let jitter = rng.random_range(-0.1..0.1);
            let sample = (mean + jitter).clamp(0.0, 1.0);
            if best.map(|(_, v)| sample > v).unwrap_or(true) {
                best = Some((action, sample));
            }
        }
        best.map(|(a, _)| a.to_string())
            .unwrap_or_else(|| CAUTIOUS_DEFAULT_ACTION.to_string())
    }

    pub fn confidence_for(&self, state_key: &str, action: &str) -> f64 {
        self.table
            .get(&QKey::new(state_key, action))
            .map(|e| e.confidence_with(self.config.ewc_threshold))
            .unwrap_or(0.0)
    }

    /// Read-only `q_value` lookup, used by the ORACLE predictor judge and
    /// by the tier orchestrator's blended tier-selection signal (§4.7).
    /// Never mutates the table — the learning loop has no reverse
    /// dependency on any judge (§9 cyclic-reference note).
    pub fn q_value_for(&self, state_key: &str, action: &str) -> f64 {
        self.table
            .get(&QKey::new(state_key, action))
            .map(|e| e.q_value)
            .unwrap_or(0.0)
    }

    /// Best known action and its `q_value`/confidence for `state_key` across
    /// the four verdict actions, used by ORACLE and the DECIDE step.
    pub fn best_known(&self, state_key: &str) -> (String, f64, f64) {
        const ACTIONS: &[&str] = &["bark", "growl", "wag", "howl"];
        let action = self.exploit(state_key, ACTIONS);
        let q_value = self.q_value_for(state_key, &action);
        let confidence = self.confidence_for(state_key, &action);
        (action, q_value, confidence)
    }

    /// Snapshot of learning health, consumed by the self-watcher perception
    /// worker so the kernel can judge its own learning progress.
    pub fn stats(&self) -> LearningStats {
        let mut unique_states = std::collections::HashSet::new();
        let mut max_confidence = 0.0_f64;
        let mut pending_flush = 0usize;
        for entry in self.table.iter() {
            unique_states.insert(entry.key().state_key.clone());
            max_confidence = max_confidence.max(entry.value().confidence());
            if entry.value().dirty {
                pending_flush += 1;
            }
        }
        LearningStats {
            states: self.table.len(),
            total_updates: self.total_updates.load(Ordering::SeqCst),
            pending_flush,
            max_confidence,
            unique_states: unique_states.len(),
        }
    }

    /// Spawn the background task that subscribes to `LEARNING_EVENT` and
    /// applies updates as they arrive; draining remaining flushes when
    /// `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let mut receiver = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        self.flush().await;
                        info!("learning loop drained and stopped");
                        break;
                    }
                    event = receiver.recv() => {
                        match event {
                            Ok(KernelEvent::LearningEvent { state_key, action, reward, judgment_id, .. }) => {
                                self.apply(&state_key, &action, reward, judgment_id).await;
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

    #[test]
    fn exploit_prefers_higher_q_value() {
        let table = DashMap::new();
        let mut high = QEntry::default();
        high.q_value = 0.9;
        table.insert(QKey::new("s", "wag"), high);
        let mut low = QEntry::default();
        low.q_value = 0.1;
        table.insert(QKey::new("s", "bark"), low);

        let learning = LearningLoop {
            table,
            total_updates: AtomicU64::new(0),
            storage: test_storage(),
            bus: EventBus::with_default_capacity(),
            config: LearningConfig::default(),
        };
        assert_eq!(learning.exploit("s", &["wag", "bark"]), "wag");
    }

    #[test]
    fn exploit_defaults_to_cautious_action_for_unknown_state() {
        let learning = LearningLoop {
            table: DashMap::new(),
            total_updates: AtomicU64::new(0),
            storage: test_storage(),
            bus: EventBus::with_default_capacity(),
            config: LearningConfig::default(),
        };
        assert_eq!(learning.exploit("unseen", &[]), CAUTIOUS_DEFAULT_ACTION);
    }

    #[test]
    fn stats_count_distinct_states_and_dirty_entries() {
        let table = DashMap::new();
        let mut dirty_entry = QEntry::default();
        dirty_entry.dirty = true;
        table.insert(QKey::new("s1", "wag"), dirty_entry);
        table.insert(QKey::new("s1", "bark"), QEntry::default());
        table.insert(QKey::new("s2", "growl"), QEntry::default());

        let learning = LearningLoop {
            table,
            total_updates: AtomicU64::new(3),
            storage: test_storage(),
            bus: EventBus::with_default_capacity(),
            config: LearningConfig::default(),
        };
        let stats = learning.stats();
        assert_eq!(stats.states, 3);
        assert_eq!(stats.unique_states, 2);
        assert_eq!(stats.pending_flush, 1);
        assert_eq!(stats.total_updates, 3);
    }

    fn test_storage() -> Arc<Storage> {
        use crate::infrastructure::memory::InMemoryStorage;
        InMemoryStorage::new_storage()
    }
}
