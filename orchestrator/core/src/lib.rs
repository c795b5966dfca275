// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # aegis-judgment-kernel
//!
//! The multi-agent, multi-tier judgment kernel at the heart of AEGIS: it
//! ingests perceptions, routes each through a cognitive tier, aggregates a
//! parallel judge panel into a PBFT-style consensus, applies an online
//! Q-learning update, and self-throttles its own depth under load.
//!
//! ## Layer structure
//!
//! ```text
//! application/    <- the judgment pipeline: panel, consensus, learning,
//!                     residual detection, tier orchestration, scheduling,
//!                     guardrails, action proposer, perception workers
//!     |
//! domain/         <- Cell/Judgment/Consensus records, the event vocabulary,
//!                     collaborator traits, config surface
//!     |
//! infrastructure/ <- the in-memory event bus and the in-memory Storage
//!                     implementation used until a real backend is wired
//! ```
//!
//! Transport, LLM adapters, persistence backends, perception source
//! adapters, embedding providers and dashboards are collaborators this
//! crate depends on as traits only ([`domain::collaborators`]); their
//! concrete implementations live outside the core.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::kernel::Kernel;
