// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Infrastructure layer: the concrete, swappable implementations of the
//! domain's seams. Only the ones the kernel's own tests and default boot
//! path need live here; real backends (Postgres, Qdrant, an LLM router)
//! are out of this core's scope (§1) and are wired in by the caller.

pub mod event_bus;
pub mod memory;
