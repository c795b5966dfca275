// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Residual detector (C6) — maintains the 21-point ring buffer of recent
//! `(reality, residual_variance, timestamp)` observations and classifies
//! emergence patterns on every new point.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::domain::cell::Reality;
use crate::domain::constants::{MAX_CONFIDENCE, PHI_INV2, RESIDUAL_WINDOW};
use crate::domain::events::KernelEvent;
use crate::domain::residual::{EmergenceDetection, EmergencePattern, ResidualPoint};
use crate::infrastructure::event_bus::EventBus;

pub struct ResidualDetector {
    window: Mutex<VecDeque<ResidualPoint>>,
    bus: EventBus,
}

impl ResidualDetector {
    pub fn new(bus: EventBus) -> Self {
        Self {
            window: Mutex::new(VecDeque::with_capacity(RESIDUAL_WINDOW)),
            bus,
        }
    }

    /// Record a new observation, sliding the window and publishing
    /// `RESIDUAL_HIGH` / `EMERGENCE_DETECTED` as warranted. `cell_id` is the
    /// Cell that produced `judgment_id`, carried through from the
    /// `JudgmentCreated` event so `RESIDUAL_HIGH` can correlate back to it.
    pub fn observe(
        &self,
        judgment_id: crate::domain::judgment::JudgmentId,
        cell_id: crate::domain::cell::CellId,
        residual_variance: f64,
        reality: Reality,
    ) {
        let point = ResidualPoint::new(judgment_id, residual_variance, reality);

        if point.unnameable {
            self.bus.publish(KernelEvent::ResidualHigh {
                judgment_id,
                residual_variance,
                cell_id,
            });
        }

        let mut window = self.window.lock();
        window.push_back(point);
        while window.len() > RESIDUAL_WINDOW {
            window.pop_front();
        }

        if let Some(detection) = Self::classify(&window) {
            info!(pattern = %detection.pattern, severity = detection.severity, "emergence pattern detected");
            self.bus.publish(KernelEvent::EmergenceDetected {
                pattern_type: detection.pattern,
                severity: detection.severity,
                evidence: detection.evidence,
            });
        }
    }

    fn classify(window: &VecDeque<ResidualPoint>) -> Option<EmergenceDetection> {
        let values: Vec<f64> = window.iter().map(|p| p.residual_variance).collect();
        let n = values.len();

        // SPIKE: single point > 0.618 while the previous three points' mean < 0.382.
        if n >= 4 {
            let last = values[n - 1];
            let prev_mean = values[n - 4..n - 1].iter().sum::<f64>() / 3.0;
            if last > MAX_CONFIDENCE && prev_mean < PHI_INV2 {
                return Some(EmergenceDetection {
                    pattern: EmergencePattern::Spike,
                    severity: (last - MAX_CONFIDENCE).clamp(0.0, 1.0),
                    evidence: values[n - 4..].to_vec(),
                });
            }
        }

        // RISING: three consecutive strictly increasing, spanning > 0.382.
        if n >= 3 {
            let a = values[n - 3];
            let b = values[n - 2];
            let c = values[n - 1];
            if a < b && b < c && (c - a) > PHI_INV2 {
                return Some(EmergenceDetection {
                    pattern: EmergencePattern::Rising,
                    severity: (c - a).clamp(0.0, 1.0),
                    evidence: vec![a, b, c],
                });
            }
        }

        // STABLE_HIGH: at least 5 of the last 7 points > 0.618.
        if n >= 7 {
            let tail = &values[n - 7..];
            let above = tail.iter().filter(|v| **v > MAX_CONFIDENCE).count();
            if above >= 5 {
                return Some(EmergenceDetection {
                    pattern: EmergencePattern::StableHigh,
                    severity: above as f64 / 7.0,
                    evidence: tail.to_vec(),
                });
            }
        }

        None
    }

    /// Spawn the background task subscribing to `JUDGMENT_CREATED`.
    pub fn spawn(self: std::sync::Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let mut receiver = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = receiver.recv() => {
                        match event {
                            Ok(KernelEvent::JudgmentCreated { judgment_id, cell_id, residual_variance, reality, .. }) => {
                                self.observe(judgment_id, cell_id, residual_variance, reality);
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

impl Default for ResidualDetector {
    fn default() -> Self {
        Self::new(EventBus::with_default_capacity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::CellId;
    use crate::domain::judgment::JudgmentId;

    #[test]
    fn spike_pattern_detected() {
        let detector = ResidualDetector::new(EventBus::with_default_capacity());
        for _ in 0..3 {
            detector.observe(JudgmentId::new(), CellId::new(), 0.1, Reality::Code);
        }
        let mut window = detector.window.lock();
        window.push_back(ResidualPoint::new(JudgmentId::new(), 0.7, Reality::Code));
        let detection = ResidualDetector::classify(&window);
        assert_eq!(detection.unwrap().pattern, EmergencePattern::Spike);
    }

    #[test]
    fn stable_high_requires_five_of_seven() {
        let values = [0.7, 0.7, 0.1, 0.7, 0.7, 0.7, 0.1];
        let window: VecDeque<ResidualPoint> = values
            .iter()
            .map(|v| ResidualPoint::new(JudgmentId::new(), *v, Reality::Code))
            .collect();
        let detection = ResidualDetector::classify(&window);
        assert_eq!(detection.unwrap().pattern, EmergencePattern::StableHigh);
    }

    #[tokio::test]
    async fn residual_high_carries_the_observing_cell_id() {
        let bus = EventBus::with_default_capacity();
        let mut receiver = bus.subscribe();
        let detector = ResidualDetector::new(bus);
        let cell_id = CellId::new();

        detector.observe(JudgmentId::new(), cell_id, 0.9, Reality::Code);

        let mut seen = None;
        while let Ok(event) = receiver.try_recv() {
            if let KernelEvent::ResidualHigh { cell_id, .. } = event {
                seen = Some(cell_id);
            }
        }
        assert_eq!(seen, Some(cell_id));
    }
}
