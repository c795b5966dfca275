// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! ANALYST — general-purpose heuristic judge. Scores on the shape of
//! `content` (size and a small set of red-flag tokens) rather than risk
//! or complexity, giving the panel a vote that disagrees with GUARDIAN
//! and CYNIC on different axes.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::cell::{Cell, Reality};
use crate::domain::constants::clamp_q_score;
use crate::domain::judge::{Judge, JudgeCapabilities, JudgeError, JudgeHealth};
use crate::domain::tier::Tier;
use crate::domain::vote::DogVote;

const RED_FLAGS: &[&str] = &["panic", "unwrap", "TODO", "FIXME", "rm -rf", "DROP TABLE"];

pub struct AnalystDog;

impl AnalystDog {
    pub fn new() -> Self {
        Self
    }

    fn content_text(cell: &Cell) -> String {
        match &cell.content {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn score_content(text: &str) -> f64 {
        let flags = RED_FLAGS.iter().filter(|f| text.contains(*f)).count();
        let base = 80.0 - (flags as f64 * 15.0);
        clamp_q_score(base)
    }
}

impl Default for AnalystDog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Judge for AnalystDog {
    fn judge_id(&self) -> &str {
        "analyst"
    }

    async fn analyze(
        &self,
        cell: &Cell,
        _budget_usd: f64,
        _context_hints: &[String],
    ) -> Result<DogVote, JudgeError> {
        let text = Self::content_text(cell);
        let score = Self::score_content(&text);
        Ok(DogVote::new(self.judge_id().into(), cell.cell_id, score, 0.4)
            .with_reasoning("lexical scan of content for red-flag tokens"))
    }

    async fn health(&self) -> JudgeHealth {
        JudgeHealth::Healthy
    }

    fn capabilities(&self) -> JudgeCapabilities {
        JudgeCapabilities {
            min_tier: Tier::Reflex,
            uses_llm: false,
            supported_realities: HashSet::from([Reality::Code, Reality::Cynic]),
            reputation: 70.0,
            is_coordinator: false,
            is_guardian: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::{Analysis, CellBuilder};

    #[tokio::test]
    async fn red_flags_lower_the_score() {
        let analyst = AnalystDog::new();
        let clean = CellBuilder::new(Reality::Code, Analysis::Judge)
            .content(serde_json::json!("fn main() { println!(\"ok\") }"))
            .build();
        let flagged = CellBuilder::new(Reality::Code, Analysis::Judge)
            .content(serde_json::json!("fn main() { x.unwrap(); /* TODO */ }"))
            .build();

        let clean_vote = analyst.analyze(&clean, 1.0, &[]).await.unwrap();
        let flagged_vote = analyst.analyze(&flagged, 1.0, &[]).await.unwrap();
        assert!(clean_vote.q_score > flagged_vote.q_score);
    }
}
