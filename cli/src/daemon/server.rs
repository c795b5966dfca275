// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Daemon HTTP server — the one local transport surface the CLI keeps
//! (§1 keeps general transport out of the core crate's scope; this is the
//! minimum needed to host a long-lived `Kernel` behind a process boundary).
//!
//! Four routes: `GET /health`, `POST /judge`, `GET /introspect`, `GET /metrics`.
//! The named error counters §7 requires (panel-failed, circuit-open,
//! consensus-failed, budget-exhausted, guardrail-blocked, event-bus-lagged,
//! qtable-flush-failed, …) are emitted as real `metrics::counter!` calls at
//! their actual occurrence sites inside `aegis-judgment-kernel` itself, not
//! just in this HTTP handler — the embedded `judge`/`probe` CLI subcommands
//! drive the same kernel without ever going through this server, so a
//! counter kept only here would silently miss those paths. `/metrics`
//! exports the Prometheus recorder's full rendering; `/introspect` stays a
//! human-shaped summary on top of it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

use aegis_judgment_kernel::domain::cell::Cell;
use aegis_judgment_kernel::domain::config::KernelConfig;
use aegis_judgment_kernel::infrastructure::memory::InMemoryStorage;
use aegis_judgment_kernel::Kernel;

use super::{remove_pid_file, write_pid_file};

struct AppState {
    kernel: Arc<Kernel>,
    started_at: Instant,
    metrics: PrometheusHandle,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
}

#[derive(Deserialize)]
struct JudgeRequest {
    cell: Cell,
    budget_usd: f64,
}

#[derive(Serialize)]
struct IntrospectResponse {
    uptime_seconds: u64,
    metrics: String,
}

pub async fn start_daemon(config_path: Option<PathBuf>, host: &str, port: u16) -> Result<()> {
    let pid = std::process::id();
    write_pid_file(pid)?;
    let _guard = PidFileGuard;

    info!(pid, "aegis judgment kernel daemon starting");

    let config = match config_path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&raw).context("failed to parse config file as YAML")?
        }
        None => KernelConfig::default(),
    };

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install prometheus recorder")?;

    let storage = InMemoryStorage::new_storage();
    let kernel = Kernel::new(config, storage);
    kernel.hydrate().await;
    kernel.spawn_background();
    kernel.spawn_workers();

    let state = Arc::new(AppState {
        kernel,
        started_at: Instant::now(),
        metrics,
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/judge", post(judge))
        .route("/introspect", get(introspect))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state);

    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind daemon listener on {addr}"))?;

    info!(%addr, "daemon listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("daemon server error")?;

    info!("daemon shut down");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

async fn judge(State(state): State<Arc<AppState>>, Json(request): Json<JudgeRequest>) -> impl IntoResponse {
    match state.kernel.process(request.cell, request.budget_usd).await {
        Ok(judgment) => (StatusCode::OK, Json(judgment)).into_response(),
        Err(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()).into_response(),
    }
}

async fn introspect(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(IntrospectResponse {
        uptime_seconds: state.started_at.elapsed().as_secs(),
        metrics: state.metrics.render(),
    })
}

async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics.render()
}

struct PidFileGuard;

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        let _ = remove_pid_file();
    }
}
