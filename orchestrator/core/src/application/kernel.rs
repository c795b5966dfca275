// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Kernel — the aggregate root. Composes every component at boot and owns
//! the background tasks; there are no free-standing globals (§9). A caller
//! builds one `Kernel` per process, submits Cells to it, and shuts it down
//! once via [`Kernel::shutdown`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::action_proposer::ActionProposer;
use crate::application::circuit_breaker::CircuitBreaker;
use crate::application::guardrails::GuardrailChain;
use crate::application::judges::default_panel;
use crate::application::learning::LearningLoop;
use crate::application::lod_controller::{HealthMetrics, LodController};
use crate::application::orchestrator::{MetaProbeRun, TierOrchestrator};
use crate::application::panel::Panel;
use crate::application::perception::{self, PerceiveWorker};
use crate::application::residual_detector::ResidualDetector;
use crate::application::scheduler::Scheduler;
use crate::domain::cell::Cell;
use crate::domain::collaborators::Storage;
use crate::domain::config::KernelConfig;
use crate::domain::judgment::Judgment;
use crate::domain::tier::Tier;
use crate::infrastructure::event_bus::EventBus;

/// The aggregate root wiring every component in §4 into one pipeline.
pub struct Kernel {
    config: KernelConfig,
    bus: EventBus,
    storage: Arc<Storage>,
    scheduler: Arc<Scheduler>,
    learning: Arc<LearningLoop>,
    lod: Arc<LodController>,
    circuit: Arc<CircuitBreaker>,
    residuals: Arc<ResidualDetector>,
    action_proposer: Arc<ActionProposer>,
    orchestrator: Arc<TierOrchestrator>,
    perception_workers: Vec<Arc<dyn PerceiveWorker>>,
    cancel: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Kernel {
    /// Build a Kernel with the default judge panel and the given storage
    /// backend. Call [`Kernel::hydrate`] to restore prior state, then
    /// [`Kernel::spawn_background`] and [`Kernel::spawn_workers`] before
    /// submitting any Cells.
    pub fn new(config: KernelConfig, storage: Arc<Storage>) -> Arc<Self> {
        let bus = EventBus::with_default_capacity();
        let learning = LearningLoop::with_config(storage.clone(), bus.clone(), config.learning.clone());
        let panel = Panel::new(default_panel(learning.clone(), storage.scholar.clone()));
        let lod = Arc::new(LodController::new(config.lod.hysteresis_ticks, bus.clone()));
        let circuit = Arc::new(CircuitBreaker::new(
            config.circuit_breaker.fail_threshold,
            Duration::from_secs(config.circuit_breaker.reset_s),
        ));
        let residuals = Arc::new(ResidualDetector::new(bus.clone()));
        let action_proposer = ActionProposer::new(storage.clone(), bus.clone());
        let perception_workers = perception::default_workers(learning.clone(), lod.clone(), bus.clone());
        let orchestrator = TierOrchestrator::with_tier_timeouts(
            panel,
            learning.clone(),
            lod.clone(),
            circuit.clone(),
            GuardrailChain::standard(),
            storage.clone(),
            bus.clone(),
            config.budget.clone(),
            config.tier_soft_timeouts.clone(),
        );

        Arc::new(Self {
            scheduler: Arc::new(Scheduler::new(config.queue_cap)),
            config,
            bus,
            storage,
            learning,
            lod,
            circuit,
            residuals,
            action_proposer,
            orchestrator,
            perception_workers,
            cancel: CancellationToken::new(),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Restore the Q-table from storage. Call once at boot before
    /// accepting traffic.
    pub async fn hydrate(&self) {
        if let Err(err) = self.learning.hydrate().await {
            warn!(error = %err, "failed to hydrate q-table, starting cold");
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Enqueue a Cell at `tier`; `false` means the tier's queue is at cap
    /// and the caller should apply its own backpressure policy.
    pub fn submit(&self, cell: Cell, tier: Tier) -> bool {
        let budget_usd = if cell.budget_usd > 0.0 {
            cell.budget_usd
        } else {
            self.config.budget.session_usd
        };
        self.scheduler.submit(cell, tier, budget_usd)
    }

    /// Run one Cell through the tier orchestrator directly, bypassing the
    /// scheduler. Used by callers that already know the tier (e.g. a
    /// synchronous API request) and by [`Kernel::run_meta_probe`].
    pub async fn process(&self, cell: Cell, budget_usd: f64) -> Result<Judgment, crate::application::orchestrator::OrchestratorError> {
        self.orchestrator.process(cell, budget_usd).await
    }

    pub async fn tick_lod(&self, metrics: &HealthMetrics) -> Option<(crate::domain::tier::SystemLod, crate::domain::tier::SystemLod)> {
        self.lod.tick(metrics)
    }

    pub async fn run_meta_probe(&self) -> MetaProbeRun {
        self.orchestrator.run_meta_probe().await
    }

    /// Spawn the long-lived background tasks: the learning loop's
    /// subscriber, the residual detector's subscriber, the action
    /// proposer's subscriber, the META probe loop, and every perception
    /// worker (C11).
    pub fn spawn_background(self: &Arc<Self>) {
        let mut handles = self.handles.lock();
        handles.push(self.learning.clone().spawn(self.cancel.clone()));
        handles.push(self.residuals.clone().spawn(self.cancel.clone()));
        handles.push(self.action_proposer.clone().spawn(self.cancel.clone()));
        handles.push(self.orchestrator.clone().spawn_meta_probe(self.cancel.clone()));
        for worker in &self.perception_workers {
            handles.push(worker.clone().spawn(self.scheduler.clone(), self.cancel.clone()));
        }
        info!(workers = self.perception_workers.len(), "kernel background tasks spawned");
    }

    /// Spawn `worker_counts` workers per tier draining the scheduler and
    /// running each dequeued Cell through the tier orchestrator.
    pub fn spawn_workers(self: &Arc<Self>) {
        let total_workers = self.config.worker_counts.reflex
            + self.config.worker_counts.micro
            + self.config.worker_counts.macro_
            + self.config.worker_counts.meta;

        let mut handles = self.handles.lock();
        for worker_id in 0..total_workers.max(1) {
            let kernel = Arc::clone(self);
            let cancel = self.cancel.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        submission = kernel.scheduler.next_blocking() => {
                            let (tier, submission) = submission;
                            match kernel.orchestrator.process(submission.cell, submission.budget_usd).await {
                                Ok(judgment) => {
                                    info!(worker_id, %tier, verdict = %judgment.verdict, "judgment produced");
                                }
                                Err(err) => {
                                    warn!(worker_id, %tier, error = %err, "pipeline run failed");
                                }
                            }
                        }
                    }
                }
            }));
        }
    }

    /// Cancel every background/worker task and wait for them to drain.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.await;
        }
        self.learning.flush().await;
        info!("kernel shut down cleanly");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::{Analysis, CellBuilder, Reality};
    use crate::infrastructure::memory::InMemoryStorage;

    #[tokio::test]
    async fn process_runs_end_to_end_and_produces_a_judgment() {
        let kernel = Kernel::new(KernelConfig::default(), InMemoryStorage::new_storage());
        let cell = CellBuilder::new(Reality::Code, Analysis::Judge).consciousness(0).build();
        let judgment = kernel.process(cell, 1.0).await.unwrap();
        assert_eq!(judgment.level_used, Tier::Reflex);
    }

    #[tokio::test]
    async fn submit_defaults_to_session_budget_when_cell_has_none() {
        let kernel = Kernel::new(KernelConfig::default(), InMemoryStorage::new_storage());
        let cell = CellBuilder::new(Reality::Code, Analysis::Judge).build();
        assert!(kernel.submit(cell, Tier::Reflex));
        let (tier, submission) = kernel.scheduler.next().await.unwrap();
        assert_eq!(tier, Tier::Reflex);
        assert_eq!(submission.budget_usd, kernel.config.budget.session_usd);
    }

    #[tokio::test]
    async fn shutdown_drains_background_tasks() {
        let kernel = Kernel::new(KernelConfig::default(), InMemoryStorage::new_storage());
        kernel.spawn_background();
        kernel.shutdown().await;
    }
}
