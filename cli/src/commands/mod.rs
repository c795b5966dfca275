// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the AEGIS CLI

pub mod config;
pub mod daemon;
pub mod judge;
pub mod probe;

pub use self::config::ConfigCommand;
pub use self::daemon::DaemonCommand;
pub use self::judge::JudgeArgs;
pub use self::probe::ProbeArgs;
