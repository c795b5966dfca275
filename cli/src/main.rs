// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # AEGIS judgment kernel CLI
//!
//! The `aegis` binary is the process entrypoint around the judgment
//! kernel: it can run one ad hoc judgment or META probe in-process, or
//! manage a long-lived daemon that hosts the kernel behind a small local
//! HTTP surface (`/health`, `/judge`, `/introspect`).
//!
//! ## Commands
//!
//! - `aegis judge` - build one Cell from flags and print its Judgment
//! - `aegis probe` - run one META probe cycle and print the pass rate
//! - `aegis daemon start|stop|status|install|uninstall` - daemon lifecycle
//! - `aegis config show|validate|generate` - configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

mod commands;
mod daemon;

use commands::{ConfigCommand, DaemonCommand, JudgeArgs, ProbeArgs};

/// AEGIS judgment kernel - ingest perceptions, reach consensus, learn
#[derive(Parser)]
#[command(name = "aegis")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Run as a background daemon hosting the kernel's HTTP surface
    #[arg(long, global = true)]
    daemon: bool,

    /// Path to a KernelConfig YAML file (overrides defaults)
    #[arg(short, long, global = true, env = "AEGIS_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Daemon HTTP port
    #[arg(long, global = true, env = "AEGIS_PORT", default_value = "8000")]
    port: u16,

    /// Daemon HTTP host
    #[arg(long, global = true, env = "AEGIS_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AEGIS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one Cell through an embedded kernel and print its Judgment
    Judge(JudgeArgs),

    /// Run one META probe cycle against an embedded kernel
    Probe(ProbeArgs),

    /// Manage daemon lifecycle
    #[command(name = "daemon")]
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    if cli.daemon {
        info!("starting aegis judgment kernel in daemon mode");
        return daemon::start_daemon(cli.config, &cli.host, cli.port).await;
    }

    match cli.command {
        Some(Commands::Judge(args)) => commands::judge::handle_command(args).await,
        Some(Commands::Probe(args)) => commands::probe::handle_command(args).await,
        Some(Commands::Daemon { command }) => {
            commands::daemon::handle_command(command, cli.config, &cli.host, cli.port).await
        }
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "no command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize the tracing subscriber the way the teacher's CLI does:
/// compact output, env-filter overridable, no target/file/line noise.
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
