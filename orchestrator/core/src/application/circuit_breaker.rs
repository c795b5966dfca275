// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Circuit breaker (C9) — cascade-failure fast-fail with half-open
//! probing. `CLOSED -> OPEN -> HALF_OPEN -> CLOSED`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Error)]
#[error("circuit_open")]
pub struct CircuitOpenError;

struct Gate {
    state: CircuitState,
    opened_at: Option<Instant>,
    half_open_probe_in_flight: bool,
}

pub struct CircuitBreaker {
    fail_threshold: u32,
    reset: Duration,
    consecutive_failures: AtomicU32,
    gate: Mutex<Gate>,
}

impl CircuitBreaker {
    pub fn new(fail_threshold: u32, reset: Duration) -> Self {
        Self {
            fail_threshold,
            reset,
            consecutive_failures: AtomicU32::new(0),
            gate: Mutex::new(Gate {
                state: CircuitState::Closed,
                opened_at: None,
                half_open_probe_in_flight: false,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.gate.lock().state
    }

    /// Call before running a pipeline. Returns `Err(CircuitOpenError)` when
    /// the circuit is open and the reset window has not elapsed; otherwise
    /// transitions OPEN -> HALF_OPEN once the window elapses and admits
    /// exactly one probe.
    pub fn allow_request(&self) -> Result<(), CircuitOpenError> {
        let mut gate = self.gate.lock();
        match gate.state {
            CircuitState::Closed => Ok(()),
            CircuitState::HalfOpen => {
                if gate.half_open_probe_in_flight {
                    Err(CircuitOpenError)
                } else {
                    gate.half_open_probe_in_flight = true;
                    Ok(())
                }
            }
            CircuitState::Open => {
                let elapsed = gate.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.reset {
                    gate.state = CircuitState::HalfOpen;
                    gate.half_open_probe_in_flight = true;
                    Ok(())
                } else {
                    Err(CircuitOpenError)
                }
            }
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        let mut gate = self.gate.lock();
        gate.state = CircuitState::Closed;
        gate.opened_at = None;
        gate.half_open_probe_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut gate = self.gate.lock();
        if gate.state == CircuitState::HalfOpen {
            gate.state = CircuitState::Open;
            gate.opened_at = Some(Instant::now());
            gate.half_open_probe_in_flight = false;
            return;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.fail_threshold {
            gate.state = CircuitState::Open;
            gate.opened_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));
        for _ in 0..4 {
            breaker.record_failure();
            assert!(breaker.allow_request().is_ok());
        }
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.allow_request().is_err());
    }

    #[test]
    fn half_open_probe_success_closes_circuit() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        assert!(breaker.allow_request().is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow_request().is_ok());
    }

    #[test]
    fn half_open_probe_failure_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        breaker.record_failure();
        breaker.allow_request().unwrap();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
