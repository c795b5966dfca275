// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate. The core crate deliberately does not
//! load config from a file (§1 Non-goals); this is where that surface
//! lives, wrapping `aegis_judgment_kernel::domain::config::KernelConfig`.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use aegis_judgment_kernel::domain::config::KernelConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (file, if given, else defaults)
    Show {
        /// Path to a YAML config file
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Validate a configuration file
    Validate {
        /// Path to config file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Write out the default configuration as YAML
    Generate {
        /// Output path (default: ./aegis-config.yaml)
        #[arg(short, long, default_value = "./aegis-config.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { file } => show(file.or(config_override)).await,
        ConfigCommand::Validate { file } => validate(file).await,
        ConfigCommand::Generate { output } => generate(output).await,
    }
}

fn load(path: &PathBuf) -> Result<KernelConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&raw).context("failed to parse config file as YAML")
}

async fn show(config_path: Option<PathBuf>) -> Result<()> {
    let config = match &config_path {
        Some(path) => load(path)?,
        None => KernelConfig::default(),
    };

    println!("{}", "Effective kernel configuration:".bold());
    match &config_path {
        Some(path) => println!("  source: {}", path.display()),
        None => println!("  source: {}", "(defaults)".dimmed()),
    }
    println!();
    println!("{}", serde_yaml::to_string(&config).context("failed to render configuration")?);

    Ok(())
}

async fn validate(config_path: PathBuf) -> Result<()> {
    println!("validating {}...", config_path.display());

    let config = load(&config_path)?;

    if config.queue_cap == 0 {
        anyhow::bail!("queue_cap must be greater than zero");
    }
    if config.budget.session_usd < 0.0 {
        anyhow::bail!("budget.session_usd must be non-negative");
    }
    if config.learning.alpha <= 0.0 || config.learning.alpha >= 1.0 {
        anyhow::bail!("learning.alpha must be in (0, 1)");
    }
    if config.circuit_breaker.fail_threshold == 0 {
        anyhow::bail!("circuit_breaker.fail_threshold must be greater than zero");
    }

    println!("{}", "configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf) -> Result<()> {
    let config = KernelConfig::default();
    let yaml = serde_yaml::to_string(&config).context("failed to render default configuration")?;

    std::fs::write(&output, yaml).with_context(|| format!("failed to write config to {}", output.display()))?;

    println!("{}", format!("configuration written: {}", output.display()).green());

    Ok(())
}
