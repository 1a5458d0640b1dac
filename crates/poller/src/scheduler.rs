//! The background poll loop and its lifecycle.
//!
//! [`PollScheduler`] owns at most one loop task. Starting replaces the
//! active configuration, stops the previous loop (bounded by
//! [`SchedulerSettings::stop_timeout`]), takes the host-wide
//! [`SingletonLock`] and spawns a fresh loop that holds the lock until it
//! exits. The loop sleeps between cycles in a `select!` with its
//! cancellation token, so a stop interrupts the sleep at once.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use licmon_controller::{collect_license_usage, ControllerError, ControllerTarget, DeviceSessionClient};
use licmon_core::config::MonitorConfig;
use licmon_core::evaluator;
use licmon_core::snapshot::UsageSnapshot;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::lock::{LockError, LockHandle, SingletonLock};
use crate::snapshot_store::SnapshotStore;
use crate::state::{ActiveConfig, MonitorState};

/// Wait after a failed cycle before trying again.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// How long a stop waits for the loop to exit before aborting it.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for scheduler lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Error type for a single poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Controller address and credentials are not configured")]
    NotConfigured,

    #[error(transparent)]
    Controller(#[from] ControllerError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl SchedulerState {
    pub fn as_str(self) -> &'static str {
        match self {
            SchedulerState::Stopped => "stopped",
            SchedulerState::Starting => "starting",
            SchedulerState::Running => "running",
            SchedulerState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`PollScheduler::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Another process holds the singleton lock; nothing was spawned.
    LockBusy,
}

/// Tunables of the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub retry_delay: Duration,
    pub stop_timeout: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

/// Identity of one loop invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopId(Uuid);

impl LoopId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

type LoopRegistry = Arc<StdMutex<HashSet<LoopId>>>;

/// Membership of a loop in the active set, removed on drop so an aborted
/// loop unregisters too.
struct LoopRegistration {
    registry: LoopRegistry,
    id: LoopId,
}

impl LoopRegistration {
    /// Register `id`, or `None` when it is already registered.
    fn register(registry: &LoopRegistry, id: LoopId) -> Option<Self> {
        let mut loops = registry.lock().unwrap_or_else(|e| e.into_inner());
        loops.insert(id).then(|| Self {
            registry: registry.clone(),
            id,
        })
    }
}

impl Drop for LoopRegistration {
    fn drop(&mut self) {
        let mut loops = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        loops.remove(&self.id);
    }
}

struct RunningLoop {
    id: LoopId,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// PollScheduler
// ---------------------------------------------------------------------------

/// Everything the loop task needs, shared with the scheduler handle.
struct Shared<C> {
    client: C,
    state: Arc<MonitorState>,
    snapshots: SnapshotStore,
    settings: SchedulerSettings,
    loops: LoopRegistry,
    /// Serializes cycles between the loop and [`PollScheduler::refresh_now`].
    cycle: Mutex<()>,
}

/// Owner of the background poll loop.
pub struct PollScheduler<C> {
    shared: Arc<Shared<C>>,
    lock: SingletonLock,
    running: Mutex<Option<RunningLoop>>,
    status: watch::Sender<SchedulerState>,
}

impl<C: DeviceSessionClient> PollScheduler<C> {
    pub fn new(
        client: C,
        state: Arc<MonitorState>,
        snapshots: SnapshotStore,
        lock: SingletonLock,
        settings: SchedulerSettings,
    ) -> Self {
        let (status, _) = watch::channel(SchedulerState::Stopped);
        Self {
            shared: Arc::new(Shared {
                client,
                state,
                snapshots,
                settings,
                loops: Arc::new(StdMutex::new(HashSet::new())),
                cycle: Mutex::new(()),
            }),
            lock,
            running: Mutex::new(None),
            status,
        }
    }

    pub fn monitor_state(&self) -> &Arc<MonitorState> {
        &self.shared.state
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        *self.status.borrow()
    }

    /// Receiver observing lifecycle changes.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.status.subscribe()
    }

    /// Number of registered loops; 0 or 1.
    pub fn active_loops(&self) -> usize {
        self.shared
            .loops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Replace the active configuration without touching the loop.
    pub async fn configure(&self, active: impl Into<ActiveConfig>) {
        self.shared.state.replace(active.into()).await;
    }

    /// Apply a configuration and (re)start the loop.
    ///
    /// A plain [`MonitorConfig`] whose notification channels cannot be
    /// built still starts polling, with notifications disabled. When the
    /// singleton lock is held elsewhere the scheduler stays stopped and
    /// `LockBusy` is returned.
    pub async fn start(&self, active: impl Into<ActiveConfig>) -> Result<StartOutcome, SchedulerError> {
        let active = active.into();
        let mut running = self.running.lock().await;

        self.shared.state.replace(active).await;

        if let Some(previous) = running.take() {
            self.stop_loop(previous).await;
        }

        self.status.send_replace(SchedulerState::Starting);
        let lock_handle = match self.lock.acquire() {
            Ok(handle) => handle,
            Err(LockError::Busy(path)) => {
                tracing::info!(
                    path = %path.display(),
                    "Poller lock held by another process, not starting"
                );
                self.status.send_replace(SchedulerState::Stopped);
                return Ok(StartOutcome::LockBusy);
            }
            Err(e) => {
                self.status.send_replace(SchedulerState::Stopped);
                return Err(e.into());
            }
        };

        let id = LoopId::new();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.shared.clone(),
            id,
            cancel.clone(),
            lock_handle,
        ));
        *running = Some(RunningLoop { id, cancel, handle });

        self.status.send_replace(SchedulerState::Running);
        tracing::info!(loop_id = %id, "Poll scheduler started");
        Ok(StartOutcome::Started)
    }

    /// Stop the loop, waiting at most `stop_timeout` for it to exit.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            self.stop_loop(previous).await;
        }
        self.status.send_replace(SchedulerState::Stopped);
    }

    /// Run one cycle now on the caller's task.
    pub async fn refresh_now(&self) -> Result<Arc<UsageSnapshot>, CycleError> {
        self.shared.run_cycle().await
    }

    // ---- private helpers ----

    async fn stop_loop(&self, mut previous: RunningLoop) {
        self.status.send_replace(SchedulerState::Stopping);
        tracing::info!(loop_id = %previous.id, "Stopping poll loop");
        previous.cancel.cancel();

        let timeout = self.shared.settings.stop_timeout;
        if tokio::time::timeout(timeout, &mut previous.handle)
            .await
            .is_err()
        {
            tracing::warn!(
                loop_id = %previous.id,
                timeout_secs = timeout.as_secs_f64(),
                "Poll loop did not stop in time, aborting"
            );
            previous.handle.abort();
            // The aborted task drops its lock handle and registration.
            let _ = previous.handle.await;
        }
    }
}

impl<C: DeviceSessionClient> Shared<C> {
    async fn run_cycle(&self) -> Result<Arc<UsageSnapshot>, CycleError> {
        let _cycle = self.cycle.lock().await;
        let active = self.state.active().await;
        let target = ControllerTarget::from_config(&active.config).ok_or(CycleError::NotConfigured)?;

        let started = Instant::now();
        let snapshot = Arc::new(collect_license_usage(&self.client, &target).await?);
        self.state.publish_snapshot(snapshot.clone()).await;

        if let Err(e) = self.snapshots.persist(&snapshot).await {
            tracing::error!(error = %e, "Failed to write snapshot record");
        }

        let alerts = evaluator::evaluate(&snapshot, &active.config.alert_settings, Utc::now());
        let mut failed = 0usize;
        for alert in &alerts {
            if active.dispatcher.dispatch_alert(alert).await.is_err() {
                failed += 1;
            }
        }

        if active.config.enable_notifications {
            active.dispatcher.dispatch_report(&snapshot).await;
        }

        tracing::info!(
            controller = %target.address,
            alerts = alerts.len(),
            failed_alerts = failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Poll cycle completed"
        );
        Ok(snapshot)
    }
}

async fn run_loop<C: DeviceSessionClient>(
    shared: Arc<Shared<C>>,
    id: LoopId,
    cancel: CancellationToken,
    lock_handle: LockHandle,
) {
    let Some(_registration) = LoopRegistration::register(&shared.loops, id) else {
        tracing::warn!(loop_id = %id, "Poll loop already running, exiting");
        return;
    };
    let _lock_handle = lock_handle;

    tracing::info!(loop_id = %id, "Poll loop started");

    while !cancel.is_cancelled() {
        let config = shared.state.config().await;
        let wait = if !config.has_controller_credentials() {
            tracing::debug!("Controller not configured, skipping cycle");
            config.poll_interval()
        } else {
            match shared.run_cycle().await {
                Ok(_) => config.poll_interval(),
                Err(e) => {
                    tracing::error!(error = %e, "Poll cycle failed");
                    shared.settings.retry_delay
                }
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
    }

    tracing::info!(loop_id = %id, "Poll loop stopped");
}
