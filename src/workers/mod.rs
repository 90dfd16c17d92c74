//! Named background workers with per-worker intervals, an overlap guard
//! and on-demand runs.
//!
//! Each worker owns one logical task at a time: a tick that fires while
//! the previous run is still executing is skipped, and `run_now` shares
//! the same guard.

use anyhow::Result;
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, error, info, warn};

use crate::constants::intervals;

pub type WorkerTask = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Stopped,
    Running,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub interval_ms: u64,
    pub status: WorkerStatus,
    pub last_run: Option<String>,
    pub last_error: Option<String>,
}

struct WorkerEntry {
    id: String,
    name: String,
    description: String,
    interval_ms: AtomicU64,
    status: RwLock<WorkerStatus>,
    last_run: RwLock<Option<String>>,
    last_error: RwLock<Option<String>>,
    /// Overlap guard: at most one invocation of `task` at any time.
    run_guard: Mutex<()>,
    task: WorkerTask,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl WorkerEntry {
    /// Execute the task once under the overlap guard. A tick that finds
    /// the guard held is dropped, not queued.
    async fn run_once(self: &Arc<Self>) {
        let Ok(_guard) = self.run_guard.try_lock() else {
            debug!(worker = %self.id, "Previous run still executing, skipping tick");
            return;
        };

        *self.last_run.write().await = Some(chrono::Utc::now().to_rfc3339());
        let start = std::time::Instant::now();
        debug!(event = "job_started", worker = %self.id, "Worker run starting");

        match (self.task)().await {
            Ok(()) => {
                *self.last_error.write().await = None;
                let mut status = self.status.write().await;
                if *status == WorkerStatus::Error {
                    *status = WorkerStatus::Running;
                }
                debug!(
                    event = "job_finished",
                    worker = %self.id,
                    duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Worker run finished"
                );
            }
            Err(e) => {
                // The schedule continues; the status records the failure.
                error!(event = "job_failed", worker = %self.id, error = %e, "Worker run failed");
                *self.last_error.write().await = Some(e.to_string());
                *self.status.write().await = WorkerStatus::Error;
            }
        }
    }

    async fn info(&self) -> WorkerInfo {
        WorkerInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            interval_ms: self.interval_ms.load(Ordering::Relaxed),
            status: *self.status.read().await,
            last_run: self.last_run.read().await.clone(),
            last_error: self.last_error.read().await.clone(),
        }
    }
}

/// The registry. Registration order is preserved; shutdown stops
/// workers in reverse order.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: Arc<RwLock<Vec<Arc<WorkerEntry>>>>,
}

impl WorkerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        id: &str,
        name: &str,
        description: &str,
        interval_ms: u64,
        task: WorkerTask,
    ) {
        let entry = Arc::new(WorkerEntry {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            interval_ms: AtomicU64::new(interval_ms.max(intervals::MINIMUM_MS)),
            status: RwLock::new(WorkerStatus::Stopped),
            last_run: RwLock::new(None),
            last_error: RwLock::new(None),
            run_guard: Mutex::new(()),
            task,
            stop_tx: Mutex::new(None),
            handle: Mutex::new(None),
        });

        self.workers.write().await.push(entry);
    }

    async fn find(&self, id: &str) -> Option<Arc<WorkerEntry>> {
        self.workers
            .read()
            .await
            .iter()
            .find(|w| w.id == id)
            .cloned()
    }

    /// Start a worker's ticker. `skip_initial` suppresses the immediate
    /// first run.
    pub async fn start(&self, id: &str, skip_initial: bool) -> Result<()> {
        let entry = self.find(id).await.ok_or_else(|| not_found(id))?;

        let mut stop_slot = entry.stop_tx.lock().await;
        if stop_slot.is_some() {
            debug!(worker = %id, "Worker already started");
            return Ok(());
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        *stop_slot = Some(stop_tx);
        drop(stop_slot);

        *entry.status.write().await = WorkerStatus::Running;
        info!(worker = %id, "Worker started");

        let ticker = Arc::clone(&entry);
        let handle = tokio::spawn(async move {
            if !skip_initial {
                ticker.run_once().await;
            }

            loop {
                let interval = ticker.interval_ms.load(Ordering::Relaxed);
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_millis(interval)) => {
                        ticker.run_once().await;
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            *ticker.status.write().await = WorkerStatus::Stopped;
            debug!(worker = %ticker.id, "Worker ticker exited");
        });

        *entry.handle.lock().await = Some(handle);
        Ok(())
    }

    pub async fn stop(&self, id: &str) -> Result<()> {
        let entry = self.find(id).await.ok_or_else(|| not_found(id))?;
        Self::stop_entry(&entry, Duration::from_secs(10)).await;
        Ok(())
    }

    async fn stop_entry(entry: &Arc<WorkerEntry>, grace: Duration) {
        let stop_tx = entry.stop_tx.lock().await.take();
        let Some(stop_tx) = stop_tx else {
            return;
        };

        let _ = stop_tx.send(true);

        if let Some(handle) = entry.handle.lock().await.take() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(grace, handle).await.is_err() {
                warn!(worker = %entry.id, "Worker did not stop within grace period, aborting");
                abort.abort();
            }
        }

        *entry.status.write().await = WorkerStatus::Stopped;
        info!(worker = %entry.id, "Worker stopped");
    }

    pub async fn restart(&self, id: &str) -> Result<()> {
        self.stop(id).await?;
        self.start(id, true).await
    }

    /// Change a worker's period. Clamped to the 1-second floor; takes
    /// effect after the current sleep.
    pub async fn set_interval(&self, id: &str, interval_ms: u64) -> Result<()> {
        let entry = self.find(id).await.ok_or_else(|| not_found(id))?;
        let clamped = interval_ms.max(intervals::MINIMUM_MS);
        entry.interval_ms.store(clamped, Ordering::Relaxed);
        info!(worker = %id, interval_ms = clamped, "Worker interval updated");
        Ok(())
    }

    /// Run a worker immediately, off the ticker task. Shares the overlap
    /// guard, so a busy worker makes this a no-op.
    pub async fn run_now(&self, id: &str) -> Result<()> {
        let entry = self.find(id).await.ok_or_else(|| not_found(id))?;

        tokio::spawn(async move {
            entry.run_once().await;
        });

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<WorkerInfo> {
        match self.find(id).await {
            Some(entry) => Some(entry.info().await),
            None => None,
        }
    }

    pub async fn list(&self) -> Vec<WorkerInfo> {
        let workers = self.workers.read().await;
        let mut infos = Vec::with_capacity(workers.len());
        for entry in workers.iter() {
            infos.push(entry.info().await);
        }
        infos
    }

    /// Start every registered worker.
    pub async fn start_all(&self, skip_initial: bool) -> Result<()> {
        let ids: Vec<String> = self
            .workers
            .read()
            .await
            .iter()
            .map(|w| w.id.clone())
            .collect();

        for id in ids {
            self.start(&id, skip_initial).await?;
        }
        Ok(())
    }

    /// Stop every worker in reverse registration order, with a 10-second
    /// grace each.
    pub async fn shutdown(&self) {
        let entries: Vec<Arc<WorkerEntry>> =
            self.workers.read().await.iter().rev().cloned().collect();

        for entry in entries {
            Self::stop_entry(&entry, Duration::from_secs(10)).await;
        }
        info!("All workers stopped");
    }
}

fn not_found(id: &str) -> anyhow::Error {
    anyhow::anyhow!("Worker not found: {id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_task(counter: Arc<AtomicUsize>, delay: Duration) -> WorkerTask {
        Arc::new(move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn run_now_executes_task() {
        let registry = WorkerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry
            .register(
                "test",
                "Test",
                "counts",
                60_000,
                counting_task(Arc::clone(&counter), Duration::ZERO),
            )
            .await;

        registry.run_now("test").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn overlap_guard_drops_concurrent_runs() {
        let registry = WorkerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry
            .register(
                "slow",
                "Slow",
                "sleeps",
                60_000,
                counting_task(Arc::clone(&counter), Duration::from_millis(300)),
            )
            .await;

        registry.run_now("slow").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        registry.run_now("slow").await.unwrap();
        registry.run_now("slow").await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_without_initial_waits_for_interval() {
        let registry = WorkerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry
            .register(
                "lazy",
                "Lazy",
                "waits",
                60_000,
                counting_task(Arc::clone(&counter), Duration::ZERO),
            )
            .await;

        registry.start("lazy", true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        let info = registry.get("lazy").await.unwrap();
        assert_eq!(info.status, WorkerStatus::Running);

        registry.stop("lazy").await.unwrap();
        let info = registry.get("lazy").await.unwrap();
        assert_eq!(info.status, WorkerStatus::Stopped);
    }

    #[tokio::test]
    async fn failing_task_marks_error_but_keeps_schedule() {
        let registry = WorkerRegistry::new();
        let task: WorkerTask = Arc::new(|| Box::pin(async { anyhow::bail!("boom") }));
        registry
            .register("flaky", "Flaky", "fails", 60_000, task)
            .await;

        registry.run_now("flaky").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let info = registry.get("flaky").await.unwrap();
        assert_eq!(info.status, WorkerStatus::Error);
        assert!(info.last_error.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn interval_is_clamped_to_floor() {
        let registry = WorkerRegistry::new();
        let task: WorkerTask = Arc::new(|| Box::pin(async { Ok(()) }));
        registry.register("fast", "Fast", "", 5_000, task).await;

        registry.set_interval("fast", 10).await.unwrap();
        let info = registry.get("fast").await.unwrap();
        assert_eq!(info.interval_ms, intervals::MINIMUM_MS);
    }

    #[tokio::test]
    async fn shutdown_stops_all_workers() {
        let registry = WorkerRegistry::new();

        for id in ["first", "second"] {
            let task: WorkerTask = Arc::new(|| Box::pin(async { Ok(()) }));
            registry.register(id, id, "", 60_000, task).await;
            registry.start(id, true).await.unwrap();
        }

        // Both are running before shutdown.
        for info in registry.list().await {
            assert_eq!(info.status, WorkerStatus::Running);
        }

        registry.shutdown().await;
        for info in registry.list().await {
            assert_eq!(info.status, WorkerStatus::Stopped);
        }
    }
}
