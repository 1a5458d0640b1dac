//! Shared fixtures for poller integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use licmon_controller::{ControllerError, DeviceSessionClient, Session, PRIMARY_COMMAND};
use licmon_core::config::MonitorConfig;
use licmon_poller::{MonitorState, PollScheduler, SchedulerSettings, SingletonLock, SnapshotStore};
use serde_json::{json, Value};

pub const POOL: &str = "License Clients License Usage for pool default";

#[derive(Default)]
struct Script {
    logins: AtomicUsize,
    failing_logins: AtomicUsize,
    hang: bool,
}

/// In-memory controller. Clones share the same script and counters.
#[derive(Clone, Default)]
pub struct FakeController {
    script: Arc<Script>,
}

impl FakeController {
    /// Reject the first `n` logins.
    pub fn failing_first(n: usize) -> Self {
        let fake = Self::default();
        fake.script.failing_logins.store(n, Ordering::SeqCst);
        fake
    }

    /// Never answer a login.
    pub fn hanging() -> Self {
        Self {
            script: Arc::new(Script {
                hang: true,
                ..Default::default()
            }),
        }
    }

    pub fn logins(&self) -> usize {
        self.script.logins.load(Ordering::SeqCst)
    }
}

impl DeviceSessionClient for FakeController {
    async fn authenticate(
        &self,
        address: &str,
        _username: &str,
        _password: &str,
    ) -> Result<Session, ControllerError> {
        self.script.logins.fetch_add(1, Ordering::SeqCst);
        if self.script.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let failing = self.script.failing_logins.load(Ordering::SeqCst);
        if failing > 0 {
            self.script.failing_logins.store(failing - 1, Ordering::SeqCst);
            return Err(ControllerError::Authentication("scripted rejection".to_string()));
        }
        Ok(Session::new(address, "uid-1"))
    }

    async fn execute_command(&self, _session: &Session, command: &str) -> Result<Value, ControllerError> {
        if command == PRIMARY_COMMAND {
            let mut usage = serde_json::Map::new();
            usage.insert(
                POOL.to_string(),
                json!([
                    {"Hostname": "ap-01", "AP": "12"},
                    {"Hostname": "ap-02", "AP": "3"},
                    {"Hostname": "TOTAL", "AP": "15"}
                ]),
            );
            Ok(Value::Object(usage))
        } else {
            Ok(json!({"_data": [{"License": {"Type": "AP", "Used": "15", "Total": "64", "Available": "49"}}]}))
        }
    }

    async fn terminate_session(&self, _session: Session) -> Result<(), ControllerError> {
        Ok(())
    }
}

/// A configuration that lets the loop run cycles.
pub fn controller_config() -> MonitorConfig {
    MonitorConfig {
        controller_ip: "10.0.60.60".to_string(),
        username: "admin".to_string(),
        password: "secret".to_string(),
        polling_interval: 60,
        ..Default::default()
    }
}

pub fn fast_settings() -> SchedulerSettings {
    SchedulerSettings {
        retry_delay: Duration::from_millis(50),
        stop_timeout: Duration::from_millis(500),
    }
}

/// Scheduler over `client` with its lock and records under `dir`.
pub fn scheduler(dir: &Path, client: FakeController) -> PollScheduler<FakeController> {
    scheduler_with(dir, client, fast_settings())
}

pub fn scheduler_with(
    dir: &Path,
    client: FakeController,
    settings: SchedulerSettings,
) -> PollScheduler<FakeController> {
    PollScheduler::new(
        client,
        Arc::new(MonitorState::from_config(MonitorConfig::default())),
        SnapshotStore::new(dir.join("records")),
        SingletonLock::new(dir.join("poller.lock")),
        settings,
    )
}

/// Wait up to five seconds for a cycle to publish a snapshot.
pub async fn wait_for_snapshot(state: &MonitorState) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if state.latest_snapshot().await.is_some() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
