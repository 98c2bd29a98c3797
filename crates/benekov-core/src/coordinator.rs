// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Benekov FVE Monitor.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Poll coordinator
//!
//! Owns the fixed-interval timer for one endpoint. Each tick fetches a body
//! on the blocking pool, parses it and, when the result is a real snapshot,
//! swaps it in as the current snapshot and notifies observers in
//! registration order. A failed tick leaves the previous snapshot in place
//! and never stops the timer.

use crate::client::SnapshotSource;
use crate::errors::RefreshError;
use crate::parser::ResponseParser;
use crate::snapshot::{Snapshot, SystemIdentity};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, trace, warn};

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Callback invoked with every newly published snapshot
pub type Observer = Arc<dyn Fn(&Arc<Snapshot>) + Send + Sync>;

/// Counters kept across ticks for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollStats {
    pub successful_ticks: u64,
    pub transport_failures: u64,
    pub payload_failures: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

struct Inner {
    name: String,
    interval: Duration,
    source: Arc<dyn SnapshotSource>,
    parser: Mutex<ResponseParser>,
    current: RwLock<Option<Arc<Snapshot>>>,
    observers: Mutex<Vec<(u64, Observer)>>,
    next_observer_id: AtomicU64,
    // held for the whole fetch + parse + publish cycle
    refresh_lock: tokio::sync::Mutex<()>,
    stats: Mutex<PollStats>,
    stopped: AtomicBool,
    shutdown: Notify,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

/// Shared handle to one endpoint's poll cycle.
///
/// Cloning is cheap; all clones drive the same timer and snapshot.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("name", &self.inner.name)
            .field("interval", &self.inner.interval)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(name: impl Into<String>, source: Arc<dyn SnapshotSource>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                interval: interval.max(MIN_INTERVAL),
                source,
                parser: Mutex::new(ResponseParser::new()),
                current: RwLock::new(None),
                observers: Mutex::new(Vec::new()),
                next_observer_id: AtomicU64::new(1),
                refresh_lock: tokio::sync::Mutex::new(()),
                stats: Mutex::new(PollStats::default()),
                stopped: AtomicBool::new(false),
                shutdown: Notify::new(),
                poll_task: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Latest published snapshot, `None` until the first successful tick
    pub fn current_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.current.read().clone()
    }

    pub fn identity(&self) -> SystemIdentity {
        self.inner.parser.lock().identity().clone()
    }

    pub fn stats(&self) -> PollStats {
        self.inner.stats.lock().clone()
    }

    /// Register a callback for every published snapshot.
    ///
    /// The observer stays registered until the returned [`Subscription`] is
    /// dropped.
    pub fn register_observer<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        let id = self.inner.next_observer_id.fetch_add(1, Ordering::Relaxed);
        self.inner.observers.lock().push((id, Arc::new(observer)));
        trace!("[FVE POLL] {}: observer {} registered", self.inner.name, id);

        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }

    /// Initial refresh awaited by setup before the timer starts
    pub async fn first_refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        info!("🚀 [FVE POLL] {}: initial refresh", self.inner.name);
        self.refresh().await
    }

    /// Run one tick now, outside the timer.
    ///
    /// Waits for an in-flight tick to finish first; ticks never overlap.
    pub async fn request_immediate_refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        debug!("[FVE POLL] {}: immediate refresh requested", self.inner.name);
        self.refresh().await
    }

    /// The cycle runs on its own task and keeps the refresh lock until fetch,
    /// parse and publish are done, even when the caller stops waiting.
    async fn refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.refresh_cycle().await })
            .await
            .map_err(|e| RefreshError::Worker(e.to_string()))?
    }

    async fn refresh_cycle(&self) -> Result<Arc<Snapshot>, RefreshError> {
        let _guard = self.inner.refresh_lock.lock().await;

        let source = Arc::clone(&self.inner.source);
        let fetched = tokio::task::spawn_blocking(move || source.fetch())
            .await
            .map_err(|e| RefreshError::Worker(e.to_string()))
            .and_then(|result| result.map_err(RefreshError::from));

        let parsed = fetched
            .and_then(|body| self.inner.parser.lock().parse(&body).map_err(RefreshError::from));

        match parsed {
            Ok(snapshot) => Ok(self.publish(snapshot)),
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.inner.current.write() = Some(Arc::clone(&snapshot));

        {
            let mut stats = self.inner.stats.lock();
            stats.successful_ticks += 1;
            stats.last_success = Some(Utc::now());
        }

        let observers: Vec<Observer> = self
            .inner
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        debug!(
            "✅ [FVE POLL] {}: snapshot published to {} observers",
            self.inner.name,
            observers.len()
        );

        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(&snapshot))).is_err() {
                error!("❌ [FVE POLL] {}: observer panicked", self.inner.name);
            }
        }

        snapshot
    }

    fn record_failure(&self, err: &RefreshError) {
        let mut stats = self.inner.stats.lock();
        if err.is_transport() {
            stats.transport_failures += 1;
            warn!(
                "⚠️ [FVE POLL] {}: transport failure, keeping previous snapshot: {}",
                self.inner.name, err
            );
        } else {
            stats.payload_failures += 1;
            warn!(
                "⚠️ [FVE PAYLOAD] {}: rejected payload, keeping previous snapshot: {}",
                self.inner.name, err
            );
        }
        stats.last_failure = Some(Utc::now());
        stats.last_error = Some(err.to_string());
    }

    /// Spawn the timer loop. The first timed tick fires one interval from now.
    pub fn start(&self) {
        let mut task = self.inner.poll_task.lock();
        if task.is_some() {
            warn!("[FVE POLL] {}: poll loop already running", self.inner.name);
            return;
        }

        self.inner.stopped.store(false, Ordering::SeqCst);
        let coordinator = self.clone();
        *task = Some(tokio::spawn(async move { coordinator.run().await }));
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .poll_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    async fn run(self) {
        let period = self.inner.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "🔄 [FVE POLL] {}: polling {} every {:?}",
            self.inner.name,
            self.inner.source.describe(),
            period
        );

        loop {
            tokio::select! {
                () = self.inner.shutdown.notified() => {
                    if self.inner.stopped.load(Ordering::SeqCst) {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if self.inner.stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Err(e) = self.refresh().await {
                        trace!("[FVE POLL] {}: tick skipped: {}", self.inner.name, e);
                    }
                }
            }
        }

        info!("🛑 [FVE POLL] {}: poll loop stopped", self.inner.name);
    }

    /// Stop the timer. An in-flight tick is allowed to finish.
    pub async fn shutdown(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.shutdown.notify_one();

        let task = self.inner.poll_task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            error!("❌ [FVE POLL] {}: poll task failed: {}", self.inner.name, e);
        }
    }
}

/// Keeps an observer registered; dropping it unregisters the observer
#[must_use = "dropping a Subscription unregisters the observer"]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.observers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}
