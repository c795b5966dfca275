// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Concrete judges (§9 "Judges as polymorphic uniform contract"). Every
//! judge here implements [`crate::domain::judge::Judge`] so the panel can
//! hold them as one `Vec<Arc<dyn Judge>>` and iterate uniformly — heuristic
//! judges never know whether they're sitting next to an LLM-backed one.
//!
//! - [`guardian::GuardianDog`] — the panel's sole veto-holder; heuristic,
//!   REFLEX-capable anomaly detection.
//! - [`cynic::CynicDog`] — the designated PBFT coordinator; heuristic,
//!   never filtered by the reputation floor.
//! - [`analyst::AnalystDog`], [`architect::ArchitectDog`] — general-purpose
//!   heuristic judges, REFLEX-capable.
//! - [`oracle::OracleDog`] — predictor; reads the Q-table read-only.
//! - [`scholar::ScholarDog`] — retrieval-backed; blends a similarity signal
//!   with a read-only Q-table peek (§9 cyclic-reference note).

pub mod analyst;
pub mod architect;
pub mod cynic;
pub mod guardian;
pub mod oracle;
pub mod scholar;

use std::sync::Arc;

use crate::application::learning::LearningLoop;
use crate::domain::collaborators::ScholarRepository;
use crate::domain::judge::Judge;

/// Assemble the fixed default panel in priority order: guardian first
/// (cheapest, catches the hard veto early), coordinator second, the two
/// general heuristics, then the predictor and retrieval judges which may
/// consult the learning loop.
pub fn default_panel(
    learning: Arc<LearningLoop>,
    scholar_repo: Arc<dyn ScholarRepository>,
) -> Vec<Arc<dyn Judge>> {
    vec![
        Arc::new(guardian::GuardianDog::new()),
        Arc::new(cynic::CynicDog::new()),
        Arc::new(analyst::AnalystDog::new()),
        Arc::new(architect::ArchitectDog::new()),
        Arc::new(oracle::OracleDog::new(learning.clone())),
        Arc::new(scholar::ScholarDog::new(learning, scholar_repo)),
    ]
}
