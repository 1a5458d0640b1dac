//! Background polling for the license monitor.
//!
//! - [`PollScheduler`] runs the poll loop under the host-wide
//!   [`SingletonLock`] and exposes start/stop/refresh.
//! - [`MonitorState`] holds the active configuration and latest snapshot
//!   shared with the HTTP API.
//! - [`ConfigStore`] and [`SnapshotStore`] persist the configuration and
//!   the per-cycle snapshot records.

pub mod config_store;
pub mod lock;
pub mod scheduler;
pub mod snapshot_store;
pub mod state;

pub use config_store::ConfigStore;
pub use lock::{LockError, LockHandle, SingletonLock};
pub use scheduler::{
    CycleError, LoopId, PollScheduler, SchedulerError, SchedulerSettings, SchedulerState,
    StartOutcome,
};
pub use snapshot_store::{SnapshotStore, StoreError};
pub use state::{ActiveConfig, MonitorState};
