// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! LOD controller (C8) — maps per-tick health metrics to the worst
//! [`SystemLod`] across all metrics, applying hysteresis so a transition
//! only takes effect after `hysteresis_ticks` consecutive ticks agree.

use parking_lot::Mutex;

use crate::domain::events::{KernelEvent, LodDirection};
use crate::domain::tier::SystemLod;
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Clone, Copy, Default)]
pub struct HealthMetrics {
    pub error_rate: f64,
    pub latency_ms: u64,
    pub queue_depth: usize,
    pub memory_pct: f64,
    pub disk_pct: f64,
}

fn worst_for_metric(value: f64, reduced: f64, emergency: f64, minimal: f64) -> SystemLod {
    if value >= minimal {
        SystemLod::Minimal
    } else if value >= emergency {
        SystemLod::Emergency
    } else if value >= reduced {
        SystemLod::Reduced
    } else {
        SystemLod::Full
    }
}

/// Worst LOD implied by a single tick of metrics, per the §4.8 table.
fn worst_lod(metrics: &HealthMetrics) -> SystemLod {
    let by_error = worst_for_metric(metrics.error_rate, 0.10, 0.30, 0.50);
    let by_latency = worst_for_metric(metrics.latency_ms as f64, 2_000.0, 5_000.0, 10_000.0);
    let by_queue = worst_for_metric(metrics.queue_depth as f64, 34.0, 89.0, 144.0);
    let by_memory = worst_for_metric(metrics.memory_pct, 0.618, 0.764, 0.90);
    let by_disk = worst_for_metric(metrics.disk_pct, 0.618, 0.764, 0.90);

    [by_error, by_latency, by_queue, by_memory, by_disk]
        .into_iter()
        .max()
        .unwrap_or(SystemLod::Full)
}

struct HysteresisState {
    current: SystemLod,
    candidate: Option<SystemLod>,
    streak: u32,
}

pub struct LodController {
    state: Mutex<HysteresisState>,
    hysteresis_ticks: u32,
    bus: EventBus,
}

impl LodController {
    pub fn new(hysteresis_ticks: u32, bus: EventBus) -> Self {
        Self {
            state: Mutex::new(HysteresisState {
                current: SystemLod::Full,
                candidate: None,
                streak: 0,
            }),
            hysteresis_ticks,
            bus,
        }
    }

    pub fn current(&self) -> SystemLod {
        self.state.lock().current
    }

    /// Feed one tick of metrics. Returns `Some((from, to))` if a transition
    /// actually took effect this tick.
    pub fn tick(&self, metrics: &HealthMetrics) -> Option<(SystemLod, SystemLod)> {
        let proposed = worst_lod(metrics);
        let mut state = self.state.lock();

        if proposed == state.current {
            state.candidate = None;
            state.streak = 0;
            return None;
        }

        if state.candidate == Some(proposed) {
            state.streak += 1;
        } else {
            state.candidate = Some(proposed);
            state.streak = 1;
        }

        if state.streak < self.hysteresis_ticks {
            return None;
        }

        let from = state.current;
        state.current = proposed;
        state.candidate = None;
        state.streak = 0;
        drop(state);

        let direction = if proposed > from { LodDirection::Down } else { LodDirection::Up };
        self.bus.publish(KernelEvent::ConsciousnessChanged {
            from,
            to: proposed,
            direction,
        });
        Some((from, proposed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_requires_three_consecutive_ticks() {
        let controller = LodController::new(3, EventBus::with_default_capacity());
        let degraded = HealthMetrics { queue_depth: 34, ..Default::default() };

        assert!(controller.tick(&degraded).is_none());
        assert!(controller.tick(&degraded).is_none());
        assert_eq!(controller.current(), SystemLod::Full);

        let transition = controller.tick(&degraded);
        assert_eq!(transition, Some((SystemLod::Full, SystemLod::Reduced)));
        assert_eq!(controller.current(), SystemLod::Reduced);
    }

    #[test]
    fn single_clean_tick_does_not_revert_transition() {
        let controller = LodController::new(3, EventBus::with_default_capacity());
        let degraded = HealthMetrics { queue_depth: 34, ..Default::default() };
        for _ in 0..3 {
            controller.tick(&degraded);
        }
        assert_eq!(controller.current(), SystemLod::Reduced);

        let clean = HealthMetrics::default();
        controller.tick(&clean);
        assert_eq!(controller.current(), SystemLod::Reduced);

        controller.tick(&clean);
        assert_eq!(controller.current(), SystemLod::Reduced);

        let transition = controller.tick(&clean);
        assert_eq!(transition, Some((SystemLod::Reduced, SystemLod::Full)));
    }

    #[test]
    fn worst_metric_wins() {
        let metrics = HealthMetrics {
            error_rate: 0.0,
            latency_ms: 0,
            queue_depth: 0,
            memory_pct: 0.95,
            disk_pct: 0.0,
        };
        assert_eq!(worst_lod(&metrics), SystemLod::Minimal);
    }
}
