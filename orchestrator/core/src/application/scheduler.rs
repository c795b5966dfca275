// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Scheduler (C10) — one bounded priority queue per tier. `submit` never
//! blocks: it returns `false` (backpressure) when the target tier's queue
//! is already at cap. Dequeue always prefers the cheapest non-empty tier
//! first, so REFLEX work is never starved behind a backlog of MACRO work.

use tokio::sync::mpsc;

use crate::domain::cell::Cell;
use crate::domain::tier::Tier;

pub struct Submission {
    pub cell: Cell,
    pub budget_usd: f64,
}

struct TierQueue {
    tx: mpsc::Sender<Submission>,
    rx: tokio::sync::Mutex<mpsc::Receiver<Submission>>,
}

pub struct Scheduler {
    reflex: TierQueue,
    micro: TierQueue,
    macro_: TierQueue,
    meta: TierQueue,
}

impl Scheduler {
    pub fn new(queue_cap: usize) -> Self {
        let make = || {
            let (tx, rx) = mpsc::channel(queue_cap);
            TierQueue {
                tx,
                rx: tokio::sync::Mutex::new(rx),
            }
        };
        Self {
            reflex: make(),
            micro: make(),
            macro_: make(),
            meta: make(),
        }
    }

    fn queue(&self, tier: Tier) -> &TierQueue {
        match tier {
            Tier::Reflex => &self.reflex,
            Tier::Micro => &self.micro,
            Tier::Macro => &self.macro_,
            Tier::Meta => &self.meta,
        }
    }

    /// Enqueue `cell` at `tier`. Returns `false` if the tier's queue is at
    /// cap; the caller is expected to drop or reschedule.
    pub fn submit(&self, cell: Cell, tier: Tier, budget_usd: f64) -> bool {
        self.queue(tier)
            .tx
            .try_send(Submission { cell, budget_usd })
            .is_ok()
    }

    /// Dequeue the next submission, checking tiers cheapest-first so
    /// REFLEX work always preempts a MACRO/META backlog.
    pub async fn next(&self) -> Option<(Tier, Submission)> {
        for tier in [Tier::Reflex, Tier::Micro, Tier::Macro, Tier::Meta] {
            let mut rx = self.queue(tier).rx.lock().await;
            if let Ok(submission) = rx.try_recv() {
                return Some((tier, submission));
            }
        }
        None
    }

    /// Block until at least one submission is available across any tier,
    /// respecting tier priority at the moment it resolves.
    pub async fn next_blocking(&self) -> (Tier, Submission) {
        loop {
            if let Some(found) = self.next().await {
                return found;
            }
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::{Analysis, CellBuilder, Reality};

    fn cell() -> Cell {
        CellBuilder::new(Reality::Code, Analysis::Judge).build()
    }

    #[tokio::test]
    async fn submit_returns_false_when_tier_queue_is_full() {
        let scheduler = Scheduler::new(2);
        assert!(scheduler.submit(cell(), Tier::Micro, 0.1));
        assert!(scheduler.submit(cell(), Tier::Micro, 0.1));
        assert!(!scheduler.submit(cell(), Tier::Micro, 0.1));
    }

    #[tokio::test]
    async fn reflex_dequeues_before_macro() {
        let scheduler = Scheduler::new(10);
        scheduler.submit(cell(), Tier::Macro, 1.0);
        scheduler.submit(cell(), Tier::Reflex, 0.0);

        let (tier, _) = scheduler.next().await.unwrap();
        assert_eq!(tier, Tier::Reflex);
    }
}
