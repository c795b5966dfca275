// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `aegis judge` — build one Cell from CLI flags and run it through an
//! embedded kernel, printing the resulting Judgment. This is the ad hoc,
//! embedded-mode counterpart to `POST /judge` on the daemon's HTTP surface.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use aegis_judgment_kernel::domain::cell::{Analysis, CellBuilder, Reality};
use aegis_judgment_kernel::domain::config::KernelConfig;
use aegis_judgment_kernel::infrastructure::memory::InMemoryStorage;
use aegis_judgment_kernel::Kernel;

#[derive(Args)]
pub struct JudgeArgs {
    /// Perception reality: code, market, social, human, cynic, solana, cosmos
    #[arg(long, default_value = "code")]
    pub reality: String,

    /// Cognitive stage: perceive, judge, decide, act, learn, account, emerge
    #[arg(long, default_value = "judge")]
    pub analysis: String,

    /// Risk score in [0, 1]
    #[arg(long, default_value_t = 0.0)]
    pub risk: f64,

    /// Complexity score in [0, 1]
    #[arg(long, default_value_t = 0.3)]
    pub complexity: f64,

    /// Consciousness hint 0..=7, used as the fallback tier-selection signal
    #[arg(long, default_value_t = 0)]
    pub consciousness: u8,

    /// Session budget in USD for this one run
    #[arg(long, default_value_t = 1.0)]
    pub budget_usd: f64,

    /// Free-text context attached to the Cell
    #[arg(long, default_value = "")]
    pub context: String,
}

fn parse_reality(s: &str) -> Result<Reality> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "code" => Reality::Code,
        "market" => Reality::Market,
        "social" => Reality::Social,
        "human" => Reality::Human,
        "cynic" => Reality::Cynic,
        "solana" => Reality::Solana,
        "cosmos" => Reality::Cosmos,
        other => anyhow::bail!("unknown reality: {other}"),
    })
}

fn parse_analysis(s: &str) -> Result<Analysis> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "perceive" => Analysis::Perceive,
        "judge" => Analysis::Judge,
        "decide" => Analysis::Decide,
        "act" => Analysis::Act,
        "learn" => Analysis::Learn,
        "account" => Analysis::Account,
        "emerge" => Analysis::Emerge,
        other => anyhow::bail!("unknown analysis: {other}"),
    })
}

pub async fn handle_command(args: JudgeArgs) -> Result<()> {
    let reality = parse_reality(&args.reality)?;
    let analysis = parse_analysis(&args.analysis)?;

    let cell = CellBuilder::new(reality, analysis)
        .risk(args.risk)
        .complexity(args.complexity)
        .consciousness(args.consciousness)
        .context(args.context)
        .build();

    let storage = InMemoryStorage::new_storage();
    let kernel = Kernel::new(KernelConfig::default(), storage);
    kernel.hydrate().await;

    let judgment = kernel
        .process(cell, args.budget_usd)
        .await
        .context("judgment pipeline failed")?;

    println!("{}", format!("verdict: {}", judgment.verdict).bold());
    println!("  tier used:      {}", judgment.level_used);
    println!("  q_score:        {:.2}", judgment.q_score);
    println!("  confidence:     {:.3}", judgment.confidence);
    println!("  consensus:      {} ({}/{})", judgment.consensus_reached, judgment.consensus_votes, judgment.consensus_quorum);
    println!("  residual var:   {:.3}{}", judgment.residual_variance, if judgment.unnameable_detected { " (unnameable)".red().to_string() } else { String::new() });
    println!("  dog votes:");
    for (judge_id, vote) in &judgment.dog_votes {
        println!(
            "    {:<10} score={:>6.2} confidence={:.3} veto={} latency={}ms cost=${:.4}",
            judge_id.0, vote.q_score, vote.confidence, vote.veto, vote.latency_ms, vote.cost_usd
        );
    }

    Ok(())
}
