//! Syslog notification delivery over UDP.
//!
//! One datagram per message, no acknowledgement and no retry: a lost
//! datagram is silently gone.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use licmon_core::config::MonitorConfig;
use tokio::net::UdpSocket;

/// Error type for syslog delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum SyslogError {
    /// Socket creation or send failed.
    #[error("Syslog I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The syslog host did not resolve to any address.
    #[error("Syslog host '{0}' did not resolve")]
    Unresolved(String),
}

/// Destination of syslog datagrams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyslogConfig {
    pub host: String,
    pub port: u16,
}

impl SyslogConfig {
    /// Syslog settings of a monitor configuration, or `None` when syslog is
    /// disabled.
    pub fn from_monitor_config(config: &MonitorConfig) -> Option<Self> {
        config.syslog_enabled.then(|| Self {
            host: config.syslog_server.trim().to_string(),
            port: config.syslog_port,
        })
    }
}

/// Sends messages to a syslog collector.
#[derive(Debug, Clone)]
pub struct SyslogDelivery {
    config: SyslogConfig,
}

impl SyslogDelivery {
    pub fn new(config: SyslogConfig) -> Self {
        Self { config }
    }

    /// Send `message` as a single datagram, newlines flattened to spaces.
    pub async fn send(&self, message: &str) -> Result<(), SyslogError> {
        let target = tokio::net::lookup_host((self.config.host.as_str(), self.config.port))
            .await?
            .next()
            .ok_or_else(|| SyslogError::Unresolved(self.config.host.clone()))?;

        let bind_addr = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(bind_addr).await?;

        let text = flatten_message(message);
        socket.send_to(text.as_bytes(), target).await?;

        tracing::debug!(%target, bytes = text.len(), "Syslog datagram sent");
        Ok(())
    }
}

/// Replace line breaks with spaces so the message fits one syslog line.
pub fn flatten_message(message: &str) -> String {
    message.replace("\r\n", " ").replace(['\n', '\r'], " ")
}
