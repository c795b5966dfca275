// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `aegis probe` — run one META axiom-integrity probe cycle (§4.7.1)
//! against an embedded kernel and print the pass rate.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use aegis_judgment_kernel::domain::config::KernelConfig;
use aegis_judgment_kernel::infrastructure::memory::InMemoryStorage;
use aegis_judgment_kernel::Kernel;

#[derive(Args)]
pub struct ProbeArgs;

pub async fn handle_command(_args: ProbeArgs) -> Result<()> {
    let storage = InMemoryStorage::new_storage();
    let kernel = Kernel::new(KernelConfig::default(), storage);
    kernel.hydrate().await;

    let run = kernel.run_meta_probe().await;

    println!("{}", format!("pass rate: {:.0}%", run.pass_rate * 100.0).bold());
    if run.regression {
        println!("{}", "regression detected vs the previous run".red());
    }
    for result in &run.results {
        let mark = if result.passed { "ok".green() } else { "fail".red() };
        println!(
            "  [{}] {:<24} observed={:.2} expected=[{:.2}, {:.2}]",
            mark, result.probe_id, result.observed, result.expected_min, result.expected_max
        );
    }

    Ok(())
}
