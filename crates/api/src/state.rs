use std::sync::Arc;

use licmon_controller::ArubaClient;
use licmon_core::config::MonitorConfig;
use licmon_poller::{
    ConfigStore, MonitorState, PollScheduler, SchedulerSettings, SingletonLock, SnapshotStore,
};
use tokio::sync::Mutex;

use crate::config::ServerConfig;

/// The poll scheduler driving the Aruba REST client.
pub type Scheduler = PollScheduler<ArubaClient>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Active monitor configuration and latest snapshot.
    pub monitor: Arc<MonitorState>,
    /// Background poller.
    pub scheduler: Arc<Scheduler>,
    /// Persistence of the monitor configuration.
    pub config_store: Arc<ConfigStore>,
    /// Serializes configuration updates together with their write to disk.
    pub config_writes: Arc<Mutex<()>>,
}

impl AppState {
    /// Wire the monitor state, stores and scheduler for `config`.
    ///
    /// The scheduler is created stopped; the caller decides whether to
    /// start it.
    pub fn new(config: ServerConfig, monitor_config: MonitorConfig, client: ArubaClient) -> Self {
        let monitor = Arc::new(MonitorState::from_config(monitor_config));
        let lock = config
            .lock_path
            .clone()
            .map(SingletonLock::new)
            .unwrap_or_default();
        let scheduler = PollScheduler::new(
            client,
            Arc::clone(&monitor),
            SnapshotStore::new(&config.data_dir),
            lock,
            SchedulerSettings::default(),
        );

        Self {
            config_store: Arc::new(ConfigStore::new(&config.data_dir)),
            config: Arc::new(config),
            monitor,
            scheduler: Arc::new(scheduler),
            config_writes: Arc::new(Mutex::new(())),
        }
    }
}
