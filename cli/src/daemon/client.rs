// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for the daemon's local surface: `/health`, `/judge`,
//! `/introspect`, `/metrics`. This is not a general RPC client — the
//! kernel's judgment pipeline is meant to run in-process (via
//! `Kernel::process`); the daemon exists only so an already-running kernel
//! can take ad hoc Cells without paying for a fresh `Kernel::new` each time.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use aegis_judgment_kernel::domain::cell::Cell;
use aegis_judgment_kernel::domain::judgment::Judgment;

#[derive(Debug, Clone)]
pub struct DaemonClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JudgeRequest {
    pub cell: Cell,
    pub budget_usd: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectResponse {
    pub uptime_seconds: u64,
    pub metrics: String,
}

impl DaemonClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let client = Client::builder().build().context("failed to create HTTP client")?;
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}:{}", host, port)
        } else {
            format!("http://{}:{}", host, port)
        };

        Ok(Self { client, base_url })
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("failed to reach daemon health endpoint")?;

        response.json().await.context("failed to parse health response")
    }

    pub async fn judge(&self, cell: Cell, budget_usd: f64) -> Result<Judgment> {
        let response = self
            .client
            .post(format!("{}/judge", self.base_url))
            .json(&JudgeRequest { cell, budget_usd })
            .send()
            .await
            .context("failed to submit judge request")?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("judge request failed: {text}");
        }

        response.json().await.context("failed to parse judgment response")
    }

    pub async fn introspect(&self) -> Result<IntrospectResponse> {
        let response = self
            .client
            .get(format!("{}/introspect", self.base_url))
            .send()
            .await
            .context("failed to reach daemon introspect endpoint")?;

        response.json().await.context("failed to parse introspect response")
    }

    /// Raw Prometheus text exposition, for scraping rather than display.
    pub async fn metrics(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/metrics", self.base_url))
            .send()
            .await
            .context("failed to reach daemon metrics endpoint")?;

        response.text().await.context("failed to read metrics response")
    }
}
