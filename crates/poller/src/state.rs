//! Shared monitor state: the active configuration and the latest snapshot.
//!
//! Both values are swapped whole behind an `Arc`. A reader clones the `Arc`
//! and keeps a consistent view for as long as it needs, even while a new
//! configuration or snapshot is being published.

use std::sync::Arc;

use licmon_core::config::{AlertRule, MonitorConfig};
use licmon_core::snapshot::UsageSnapshot;
use licmon_core::types::EntityId;
use licmon_events::{DispatchError, NotificationDispatcher};
use tokio::sync::RwLock;

/// A configuration together with the dispatcher built from it.
#[derive(Debug)]
pub struct ActiveConfig {
    pub config: MonitorConfig,
    pub dispatcher: NotificationDispatcher,
}

impl ActiveConfig {
    /// Build the dispatcher for `config`.
    pub fn new(config: MonitorConfig) -> Result<Self, DispatchError> {
        let dispatcher = NotificationDispatcher::from_config(&config)?;
        Ok(Self { config, dispatcher })
    }

    /// A configuration whose notification channels could not be built.
    /// Alerts are dropped until a working configuration is applied.
    pub fn without_notifications(config: MonitorConfig) -> Self {
        Self {
            config,
            dispatcher: NotificationDispatcher::disabled(),
        }
    }
}

impl From<MonitorConfig> for ActiveConfig {
    /// Build the dispatcher for `config`, falling back to no notifications
    /// when its channels cannot be built.
    fn from(config: MonitorConfig) -> Self {
        match NotificationDispatcher::from_config(&config) {
            Ok(dispatcher) => Self { config, dispatcher },
            Err(e) => {
                tracing::error!(error = %e, "Notification channels unavailable, alerts disabled");
                Self::without_notifications(config)
            }
        }
    }
}

/// Process-wide monitor state shared by the poller and the HTTP API.
#[derive(Debug)]
pub struct MonitorState {
    active: RwLock<Arc<ActiveConfig>>,
    snapshot: RwLock<Option<Arc<UsageSnapshot>>>,
}

impl MonitorState {
    pub fn new(active: ActiveConfig) -> Self {
        Self {
            active: RwLock::new(Arc::new(active)),
            snapshot: RwLock::new(None),
        }
    }

    /// Start from `config`, falling back to no notifications when its
    /// channels cannot be built.
    pub fn from_config(config: MonitorConfig) -> Self {
        Self::new(config.into())
    }

    /// The active configuration and dispatcher.
    pub async fn active(&self) -> Arc<ActiveConfig> {
        self.active.read().await.clone()
    }

    /// A copy of the active configuration.
    pub async fn config(&self) -> MonitorConfig {
        self.active.read().await.config.clone()
    }

    /// Swap in a new configuration.
    pub async fn replace(&self, active: ActiveConfig) -> Arc<ActiveConfig> {
        let active = Arc::new(active);
        *self.active.write().await = active.clone();
        active
    }

    /// Insert or overwrite one alert rule and return the resulting
    /// configuration. The dispatcher is carried over unchanged because
    /// rules do not affect the channels.
    pub async fn save_rule(&self, entity: impl Into<EntityId>, rule: AlertRule) -> MonitorConfig {
        let mut guard = self.active.write().await;
        let mut config = guard.config.clone();
        config.set_rule(entity, rule);

        let dispatcher = guard.dispatcher.clone();
        *guard = Arc::new(ActiveConfig {
            config: config.clone(),
            dispatcher,
        });
        config
    }

    /// The most recent snapshot, if any cycle has succeeded.
    pub async fn latest_snapshot(&self) -> Option<Arc<UsageSnapshot>> {
        self.snapshot.read().await.clone()
    }

    /// Publish a new snapshot, superseding the previous one.
    pub async fn publish_snapshot(&self, snapshot: Arc<UsageSnapshot>) {
        *self.snapshot.write().await = Some(snapshot);
    }
}
