// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Perception workers (C11) — autonomous sensors that generate Cells for
//! the scheduler without waiting on an inbound request. Each worker
//! implements [`PerceiveWorker::sense`]; the trait's default `spawn` loop
//! calls it on a Fibonacci-derived cadence, submits whatever Cell comes
//! back, and sleeps until the next tick. Target mix is 20% autonomous /
//! 80% reactive traffic through the scheduler.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::learning::LearningLoop;
use crate::application::lod_controller::LodController;
use crate::application::scheduler::Scheduler;
use crate::domain::cell::{Analysis, Cell, CellBuilder, Reality, TimeDim};
use crate::domain::constants::fib;
use crate::domain::events::KernelEvent;
use crate::domain::tier::{SystemLod, Tier};
use crate::infrastructure::event_bus::EventBus;

/// One autonomous sensor. `sense` must be non-blocking at the `async fn`
/// boundary — workers that need a blocking call (subprocess, filesystem,
/// network) route it through [`tokio::task::spawn_blocking`].
#[async_trait]
pub trait PerceiveWorker: Send + Sync {
    fn name(&self) -> &str;
    fn tier(&self) -> Tier;
    fn interval(&self) -> Duration;
    async fn sense(&self) -> Option<Cell>;

    /// Sense, submit, sleep, repeat, until `cancel` fires. Errors from
    /// `sense` never stop the loop — a single bad tick is logged and
    /// skipped.
    fn spawn(self: Arc<Self>, scheduler: Arc<Scheduler>, cancel: CancellationToken) -> tokio::task::JoinHandle<()>
    where
        Self: 'static,
    {
        tokio::spawn(async move {
            info!(
                worker = self.name(),
                interval_s = self.interval().as_secs_f64(),
                tier = %self.tier(),
                "perceive worker started"
            );
            loop {
                if cancel.is_cancelled() {
                    break;
                }

                match self.sense().await {
                    Some(cell) => {
                        let budget_usd = cell.budget_usd;
                        if scheduler.submit(cell, self.tier(), budget_usd) {
                            debug!(worker = self.name(), "submitted perception cell");
                        } else {
                            debug!(worker = self.name(), "queue full, cell dropped");
                        }
                    }
                    None => {}
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.interval()) => {}
                }
            }
            info!(worker = self.name(), "perceive worker cancelled");
        })
    }
}

/// Default panel of perception workers wired to `learning`/`lod` for the
/// two workers that observe kernel-internal state.
pub fn default_workers(learning: Arc<LearningLoop>, lod: Arc<LodController>, bus: EventBus) -> Vec<Arc<dyn PerceiveWorker>> {
    vec![
        Arc::new(GitWatcher::new(None)),
        Arc::new(HealthWatcher::new(lod)),
        Arc::new(SelfWatcher::new(learning)),
        Arc::new(MarketWatcher::new()),
        Arc::new(SolanaWatcher::new(None)),
        Arc::new(SocialWatcher::new(None)),
        Arc::new(DiskWatcher::new(None, bus.clone())),
        Arc::new(MemoryWatcher::new(bus)),
    ]
}

// ---------------------------------------------------------------------------
// GIT WATCHER — CODE×PERCEIVE/REFLEX every F(5)=5s
// ---------------------------------------------------------------------------

/// Monitors the working tree for uncommitted changes via `git2`. Submits
/// CODE×PERCEIVE at REFLEX only when the change set differs from the
/// last observation.
pub struct GitWatcher {
    repo_path: Option<PathBuf>,
    last_hash: Mutex<Option<u64>>,
}

impl GitWatcher {
    pub fn new(repo_path: Option<PathBuf>) -> Self {
        Self {
            repo_path,
            last_hash: Mutex::new(None),
        }
    }

    fn scan(path: Option<PathBuf>) -> Option<(u64, usize, String)> {
        use std::hash::{Hash, Hasher};

        let repo = match &path {
            Some(p) => git2::Repository::open(p).ok()?,
            None => git2::Repository::open(".").ok()?,
        };
        let statuses = repo.statuses(None).ok()?;
        if statuses.len() == 0 {
            return None;
        }

        let mut summary = String::new();
        for entry in statuses.iter() {
            if let Some(path) = entry.path() {
                summary.push_str(path);
                summary.push('\n');
            }
        }

        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        summary.hash(&mut hasher);
        Some((hasher.finish(), statuses.len(), summary))
    }
}

#[async_trait]
impl PerceiveWorker for GitWatcher {
    fn name(&self) -> &str {
        "git_watcher"
    }

    fn tier(&self) -> Tier {
        Tier::Reflex
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(fib::F5 as u64)
    }

    async fn sense(&self) -> Option<Cell> {
        let path = self.repo_path.clone();
        let scanned = tokio::task::spawn_blocking(move || GitWatcher::scan(path)).await.ok()??;
        let (hash, count, summary) = scanned;

        let mut last = self.last_hash.lock();
        if *last == Some(hash) {
            return None;
        }
        *last = Some(hash);

        Some(
            CellBuilder::new(Reality::Code, Analysis::Perceive)
                .time_dim(TimeDim::Present)
                .content(serde_json::json!({
                    "git_status": summary.chars().take(1500).collect::<String>(),
                    "changed_files": count,
                }))
                .context(format!("git watcher: {count} changed file(s) detected"))
                .risk(0.0)
                .complexity((count as f64 / 50.0).min(1.0))
                .budget_usd(0.001)
                .build(),
        )
    }
}

// ---------------------------------------------------------------------------
// HEALTH WATCHER — CYNIC×PERCEIVE/REFLEX every F(8)=21s
// ---------------------------------------------------------------------------

/// Monitors the kernel's own self-throttle level. Submits CYNIC×PERCEIVE
/// at REFLEX only when the LOD controller has moved off `Full` — the
/// kernel seeing its own slowness.
pub struct HealthWatcher {
    lod: Arc<LodController>,
}

impl HealthWatcher {
    pub fn new(lod: Arc<LodController>) -> Self {
        Self { lod }
    }
}

#[async_trait]
impl PerceiveWorker for HealthWatcher {
    fn name(&self) -> &str {
        "health_watcher"
    }

    fn tier(&self) -> Tier {
        Tier::Reflex
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(fib::F8 as u64)
    }

    async fn sense(&self) -> Option<Cell> {
        let current = self.lod.current();
        if current == SystemLod::Full {
            return None;
        }

        let risk = if current == SystemLod::Reduced { 0.2 } else { 0.5 };

        Some(
            CellBuilder::new(Reality::Cynic, Analysis::Perceive)
                .time_dim(TimeDim::Present)
                .content(serde_json::json!({ "lod": current.to_string() }))
                .context(format!("health watcher: system lod degraded to {current}"))
                .risk(risk)
                .complexity(0.3)
                .budget_usd(0.001)
                .build(),
        )
    }
}

// ---------------------------------------------------------------------------
// SELF WATCHER — CYNIC×LEARN/MICRO every F(10)=55s
// ---------------------------------------------------------------------------

/// The kernel observing its own Q-table learning health. Closes the loop:
/// the judgment system judges its own learning state, which in turn feeds
/// more learning.
pub struct SelfWatcher {
    learning: Arc<LearningLoop>,
}

impl SelfWatcher {
    pub fn new(learning: Arc<LearningLoop>) -> Self {
        Self { learning }
    }
}

#[async_trait]
impl PerceiveWorker for SelfWatcher {
    fn name(&self) -> &str {
        "self_watcher"
    }

    fn tier(&self) -> Tier {
        Tier::Micro
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(fib::F10 as u64)
    }

    async fn sense(&self) -> Option<Cell> {
        let stats = self.learning.stats();

        Some(
            CellBuilder::new(Reality::Cynic, Analysis::Learn)
                .time_dim(TimeDim::Present)
                .content(serde_json::json!({
                    "states": stats.states,
                    "total_updates": stats.total_updates,
                    "pending_flush": stats.pending_flush,
                    "max_confidence": stats.max_confidence,
                    "unique_states": stats.unique_states,
                }))
                .context(format!(
                    "self-watcher: {} states learned, {} total updates",
                    stats.states, stats.total_updates
                ))
                .risk(0.0)
                .complexity(0.2)
                .budget_usd(0.003)
                .build(),
        )
    }
}

// ---------------------------------------------------------------------------
// MARKET WATCHER — MARKET×PERCEIVE/REFLEX every F(9)=34s
// ---------------------------------------------------------------------------

const COINGECKO_URL: &str = "https://api.coingecko.com/api/v3/simple/price?ids=solana&vs_currencies=usd&include_24hr_change=true";
const MARKET_MOVE_THRESHOLD: f64 = 0.02;

/// Monitors SOL/USD via the public CoinGecko API. Submits MARKET×PERCEIVE
/// at REFLEX only on moves >2% since the last observed price (or a >5%
/// 24h swing). Network errors degrade to `None`, never a panic.
pub struct MarketWatcher {
    last_price: Mutex<Option<f64>>,
    client: reqwest::Client,
}

impl MarketWatcher {
    pub fn new() -> Self {
        Self {
            last_price: Mutex::new(None),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .user_agent("aegis-judgment-kernel/market-watcher")
                .build()
                .unwrap_or_default(),
        }
    }

    async fn fetch_price(client: &reqwest::Client) -> Option<(f64, f64)> {
        let body: serde_json::Value = client.get(COINGECKO_URL).send().await.ok()?.json().await.ok()?;
        let sol = body.get("solana")?;
        let price = sol.get("usd")?.as_f64()?;
        let change_24h = sol.get("usd_24h_change").and_then(|v| v.as_f64()).unwrap_or(0.0);
        Some((price, change_24h))
    }
}

impl Default for MarketWatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PerceiveWorker for MarketWatcher {
    fn name(&self) -> &str {
        "market_watcher"
    }

    fn tier(&self) -> Tier {
        Tier::Reflex
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(fib::F9 as u64)
    }

    async fn sense(&self) -> Option<Cell> {
        let (price, change_24h) = match Self::fetch_price(&self.client).await {
            Some(result) => result,
            None => return None,
        };
        if price <= 0.0 {
            return None;
        }

        let mut last = self.last_price.lock();
        if let Some(prev) = *last {
            let move_frac = (price - prev).abs() / prev;
            if move_frac < MARKET_MOVE_THRESHOLD && change_24h.abs() < 5.0 {
                *last = Some(price);
                return None;
            }
        }
        *last = Some(price);
        drop(last);

        let volatility = (change_24h.abs() / 20.0).min(1.0);

        Some(
            CellBuilder::new(Reality::Market, Analysis::Perceive)
                .time_dim(TimeDim::Present)
                .content(serde_json::json!({
                    "sol_usd": price,
                    "change_24h_pct": change_24h,
                }))
                .context(format!("market watcher: SOL=${price:.2} ({change_24h:+.2}% 24h)"))
                .risk(volatility)
                .complexity(0.2)
                .budget_usd(0.001)
                .build(),
        )
    }
}

// ---------------------------------------------------------------------------
// SOLANA WATCHER — SOLANA×PERCEIVE/REFLEX every F(9)=34s
// ---------------------------------------------------------------------------

const TPS_WARNING_THRESHOLD: f64 = 1000.0;

/// Monitors Solana mainnet liveness via the public JSON-RPC endpoint.
/// Submits SOLANA×PERCEIVE at REFLEX only on anomalies: a stuck slot or
/// TPS below the warning threshold.
pub struct SolanaWatcher {
    rpc_url: String,
    last_slot: Mutex<Option<u64>>,
    client: reqwest::Client,
}

impl SolanaWatcher {
    pub fn new(rpc_url: Option<String>) -> Self {
        Self {
            rpc_url: rpc_url.unwrap_or_else(|| "https://api.mainnet-beta.solana.com".to_string()),
            last_slot: Mutex::new(None),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
        }
    }

    async fn rpc_call(client: &reqwest::Client, url: &str, method: &str, params: serde_json::Value) -> Option<serde_json::Value> {
        let body = serde_json::json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        let resp: serde_json::Value = client.post(url).json(&body).send().await.ok()?.json().await.ok()?;
        resp.get("result").cloned()
    }

    async fn fetch_chain_state(client: &reqwest::Client, url: &str) -> Option<(u64, f64)> {
        let slot = Self::rpc_call(client, url, "getSlot", serde_json::json!([])).await?.as_u64()?;
        let samples = Self::rpc_call(client, url, "getRecentPerformanceSamples", serde_json::json!([1])).await;
        let tps = samples
            .and_then(|v| v.as_array().cloned())
            .and_then(|arr| arr.into_iter().next())
            .map(|sample| {
                let elapsed = sample.get("samplePeriodSecs").and_then(|v| v.as_f64()).unwrap_or(1.0).max(1.0);
                let transactions = sample.get("numTransactions").and_then(|v| v.as_f64()).unwrap_or(0.0);
                transactions / elapsed
            })
            .unwrap_or(0.0);
        Some((slot, tps))
    }
}

#[async_trait]
impl PerceiveWorker for SolanaWatcher {
    fn name(&self) -> &str {
        "solana_watcher"
    }

    fn tier(&self) -> Tier {
        Tier::Reflex
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(fib::F9 as u64)
    }

    async fn sense(&self) -> Option<Cell> {
        let (slot, tps) = Self::fetch_chain_state(&self.client, &self.rpc_url).await?;

        let mut last = self.last_slot.lock();
        let slot_stuck = *last == Some(slot);
        let low_tps = tps > 0.0 && tps < TPS_WARNING_THRESHOLD;
        *last = Some(slot);
        drop(last);

        if !slot_stuck && !low_tps {
            return None;
        }

        let mut issues = Vec::new();
        if slot_stuck {
            issues.push(format!("slot stuck at {slot}"));
        }
        if low_tps {
            issues.push(format!("low TPS={tps:.0}"));
        }
        let risk = if slot_stuck { 0.4 } else { 0.2 };

        Some(
            CellBuilder::new(Reality::Solana, Analysis::Perceive)
                .time_dim(TimeDim::Present)
                .content(serde_json::json!({
                    "slot": slot,
                    "tps": tps,
                    "slot_stuck": slot_stuck,
                    "low_tps": low_tps,
                }))
                .context(format!("solana watcher anomaly: {}", issues.join(", ")))
                .risk(risk)
                .complexity(0.3)
                .budget_usd(0.001)
                .build(),
        )
    }
}

// ---------------------------------------------------------------------------
// SOCIAL WATCHER — SOCIAL×PERCEIVE/MICRO every F(11)=89s
// ---------------------------------------------------------------------------

fn default_social_signal_path() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".aegis").join("social.json")
}

/// Reads social signals from a local JSON feed written by any external hook
/// (a bot, a script). Only unread signals are submitted; each is marked
/// read afterward so it is not re-submitted.
pub struct SocialWatcher {
    path: PathBuf,
    last_ts: AtomicI64,
}

impl SocialWatcher {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.unwrap_or_else(default_social_signal_path),
            last_ts: AtomicI64::new(0),
        }
    }

    fn read_unread(path: &PathBuf, after_ts: i64) -> Option<serde_json::Value> {
        let raw = std::fs::read_to_string(path).ok()?;
        let data: serde_json::Value = serde_json::from_str(&raw).ok()?;
        let signals = match &data {
            serde_json::Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        };
        signals.into_iter().find(|sig| {
            let read = sig.get("read").and_then(|v| v.as_bool()).unwrap_or(false);
            let ts = sig.get("ts").and_then(|v| v.as_i64()).unwrap_or(0);
            !read && ts > after_ts
        })
    }

    fn mark_read(path: &PathBuf, ts: i64) {
        let Ok(raw) = std::fs::read_to_string(path) else { return };
        let Ok(mut data) = serde_json::from_str::<serde_json::Value>(&raw) else { return };
        let mark = |sig: &mut serde_json::Value| {
            if sig.get("ts").and_then(|v| v.as_i64()) == Some(ts) {
                if let Some(obj) = sig.as_object_mut() {
                    obj.insert("read".to_string(), serde_json::Value::Bool(true));
                }
            }
        };
        match &mut data {
            serde_json::Value::Array(items) => items.iter_mut().for_each(mark),
            other => mark(other),
        }
        if let Ok(serialized) = serde_json::to_string(&data) {
            let _ = std::fs::write(path, serialized);
        }
    }
}

#[async_trait]
impl PerceiveWorker for SocialWatcher {
    fn name(&self) -> &str {
        "social_watcher"
    }

    fn tier(&self) -> Tier {
        Tier::Micro
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(fib::F11 as u64)
    }

    async fn sense(&self) -> Option<Cell> {
        let path = self.path.clone();
        let after_ts = self.last_ts.load(Ordering::SeqCst);
        let signal = tokio::task::spawn_blocking(move || SocialWatcher::read_unread(&path, after_ts))
            .await
            .ok()??;

        let ts = signal.get("ts").and_then(|v| v.as_i64()).unwrap_or(0);
        self.last_ts.store(ts, Ordering::SeqCst);

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || SocialWatcher::mark_read(&path, ts)).await.ok();

        let sentiment = signal.get("sentiment").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let volume = signal.get("volume").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let source = signal.get("source").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
        let topic = signal.get("topic").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let signal_type = signal.get("signal_type").and_then(|v| v.as_str()).unwrap_or("mention").to_string();

        let risk = (0.5 - sentiment * 0.5).clamp(0.0, 1.0);

        Some(
            CellBuilder::new(Reality::Social, Analysis::Perceive)
                .time_dim(TimeDim::Present)
                .content(serde_json::json!({
                    "source": source,
                    "sentiment": sentiment,
                    "volume": volume,
                    "topic": topic,
                    "signal_type": signal_type,
                }))
                .context(format!("social watcher: {source} sentiment={sentiment:+.2} volume={volume:.0} topic={topic}"))
                .risk(risk)
                .complexity(0.3)
                .budget_usd(0.002)
                .build(),
        )
    }
}

// ---------------------------------------------------------------------------
// DISK WATCHER — CYNIC×PERCEIVE/REFLEX every F(9)=34s
// ---------------------------------------------------------------------------

fn pressure_from_fraction(used_fraction: f64) -> SystemLod {
    if used_fraction >= 0.90 {
        SystemLod::Minimal
    } else if used_fraction >= 0.764 {
        SystemLod::Emergency
    } else if used_fraction >= 0.618 {
        SystemLod::Reduced
    } else {
        SystemLod::Full
    }
}

/// Monitors disk usage via `sysinfo`. Emits CYNIC×PERCEIVE at REFLEX, and a
/// [`crate::domain::events::KernelEvent::DiskPressure`] that feeds the LOD
/// controller, only when the pressure level changes.
pub struct DiskWatcher {
    mount_path: PathBuf,
    last_level: Mutex<Option<SystemLod>>,
    bus: EventBus,
}

impl DiskWatcher {
    pub fn new(mount_path: Option<PathBuf>, bus: EventBus) -> Self {
        Self {
            mount_path: mount_path.unwrap_or_else(|| PathBuf::from("/")),
            last_level: Mutex::new(None),
            bus,
        }
    }

    fn check(mount_path: &PathBuf) -> Option<(f64, f64, SystemLod)> {
        let disks = sysinfo::Disks::new_with_refreshed_list();
        let disk = disks
            .iter()
            .filter(|d| mount_path.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .or_else(|| disks.iter().next())?;

        let total = disk.total_space();
        if total == 0 {
            return None;
        }
        let available = disk.available_space();
        let used_pct = 1.0 - (available as f64 / total as f64);
        let free_gb = available as f64 / (1024.0_f64.powi(3));
        Some((used_pct, free_gb, pressure_from_fraction(used_pct)))
    }
}

#[async_trait]
impl PerceiveWorker for DiskWatcher {
    fn name(&self) -> &str {
        "disk_watcher"
    }

    fn tier(&self) -> Tier {
        Tier::Reflex
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(fib::F9 as u64)
    }

    async fn sense(&self) -> Option<Cell> {
        let mount_path = self.mount_path.clone();
        let (used_pct, free_gb, pressure) = tokio::task::spawn_blocking(move || DiskWatcher::check(&mount_path))
            .await
            .ok()??;

        let mut last = self.last_level.lock();
        if pressure == SystemLod::Full {
            if last.is_some() {
                info!("disk watcher: pressure cleared");
            }
            *last = None;
            return None;
        }
        if *last == Some(pressure) {
            return None;
        }
        *last = Some(pressure);
        drop(last);

        self.bus.publish(KernelEvent::DiskPressure { used_pct, pressure });

        let risk = match pressure {
            SystemLod::Reduced => 0.4,
            SystemLod::Emergency => 0.7,
            SystemLod::Minimal => 1.0,
            SystemLod::Full => 0.0,
        };

        Some(
            CellBuilder::new(Reality::Cynic, Analysis::Perceive)
                .time_dim(TimeDim::Present)
                .content(serde_json::json!({
                    "disk_used_pct": used_pct * 100.0,
                    "disk_free_gb": free_gb,
                    "disk_pressure": pressure.to_string(),
                }))
                .context(format!("disk watcher: {:.1}% full ({:.1} GB free) — {pressure}", used_pct * 100.0, free_gb))
                .risk(risk)
                .complexity(0.2)
                .budget_usd(0.001)
                .build(),
        )
    }
}

// ---------------------------------------------------------------------------
// MEMORY WATCHER — CYNIC×PERCEIVE/REFLEX every F(9)=34s
// ---------------------------------------------------------------------------

/// Monitors RAM usage via `sysinfo`. Emits CYNIC×PERCEIVE at REFLEX, and a
/// [`crate::domain::events::KernelEvent::MemoryPressure`] that feeds the
/// LOD controller, only when the pressure level changes.
pub struct MemoryWatcher {
    last_level: Mutex<Option<SystemLod>>,
    bus: EventBus,
}

impl MemoryWatcher {
    pub fn new(bus: EventBus) -> Self {
        Self {
            last_level: Mutex::new(None),
            bus,
        }
    }

    fn check() -> Option<(f64, f64, SystemLod)> {
        let mut system = sysinfo::System::new();
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return None;
        }
        let used = system.used_memory();
        let used_pct = used as f64 / total as f64;
        let free_gb = (total - used) as f64 / (1024.0_f64.powi(3));
        Some((used_pct, free_gb, pressure_from_fraction(used_pct)))
    }
}

#[async_trait]
impl PerceiveWorker for MemoryWatcher {
    fn name(&self) -> &str {
        "memory_watcher"
    }

    fn tier(&self) -> Tier {
        Tier::Reflex
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(fib::F9 as u64)
    }

    async fn sense(&self) -> Option<Cell> {
        let (used_pct, free_gb, pressure) = tokio::task::spawn_blocking(MemoryWatcher::check).await.ok()??;

        let mut last = self.last_level.lock();
        if pressure == SystemLod::Full {
            if last.is_some() {
                info!("memory watcher: pressure cleared");
            }
            *last = None;
            return None;
        }
        if *last == Some(pressure) {
            return None;
        }
        *last = Some(pressure);
        drop(last);

        self.bus.publish(KernelEvent::MemoryPressure { used_pct, pressure });

        let risk = match pressure {
            SystemLod::Reduced => 0.3,
            SystemLod::Emergency => 0.6,
            SystemLod::Minimal => 0.9,
            SystemLod::Full => 0.0,
        };

        Some(
            CellBuilder::new(Reality::Cynic, Analysis::Perceive)
                .time_dim(TimeDim::Present)
                .content(serde_json::json!({
                    "mem_used_pct": used_pct * 100.0,
                    "mem_free_gb": free_gb,
                    "mem_pressure": pressure.to_string(),
                }))
                .context(format!("memory watcher: {:.1}% RAM used ({:.1} GB free) — {pressure}", used_pct * 100.0, free_gb))
                .risk(risk)
                .complexity(0.2)
                .budget_usd(0.001)
                .build(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::event_bus::EventBus;

    #[test]
    fn pressure_thresholds_match_the_phi_derived_bounds() {
        assert_eq!(pressure_from_fraction(0.5), SystemLod::Full);
        assert_eq!(pressure_from_fraction(0.618), SystemLod::Reduced);
        assert_eq!(pressure_from_fraction(0.764), SystemLod::Emergency);
        assert_eq!(pressure_from_fraction(0.90), SystemLod::Minimal);
    }

    #[tokio::test]
    async fn health_watcher_is_silent_while_lod_is_full() {
        let lod = Arc::new(LodController::new(3, EventBus::with_default_capacity()));
        let worker = HealthWatcher::new(lod);
        assert!(worker.sense().await.is_none());
    }

    #[tokio::test]
    async fn self_watcher_reports_learning_stats() {
        use crate::infrastructure::memory::InMemoryStorage;
        let learning = LearningLoop::new(InMemoryStorage::new_storage(), EventBus::with_default_capacity());
        let worker = SelfWatcher::new(learning);
        let cell = worker.sense().await.expect("self watcher always reports");
        assert_eq!(cell.reality, Reality::Cynic);
        assert_eq!(cell.analysis, Analysis::Learn);
    }

    #[tokio::test]
    async fn social_watcher_returns_none_when_no_signal_file_exists() {
        let worker = SocialWatcher::new(Some(PathBuf::from("/nonexistent/aegis-social-signal.json")));
        assert!(worker.sense().await.is_none());
    }

    #[test]
    fn default_workers_builds_all_eight() {
        use crate::infrastructure::memory::InMemoryStorage;
        let bus = EventBus::with_default_capacity();
        let learning = LearningLoop::new(InMemoryStorage::new_storage(), bus.clone());
        let lod = Arc::new(LodController::new(3, bus.clone()));
        let workers = default_workers(learning, lod, bus);
        assert_eq!(workers.len(), 8);
    }
}
