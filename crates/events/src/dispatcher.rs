//! The set of notification channels built from one configuration.
//!
//! A [`NotificationDispatcher`] is created whenever a configuration is
//! applied, so the first alert after a change already goes out through
//! fully configured channels. Delivery is fire-once: failures are logged
//! and returned, never retried.

use licmon_core::alert::{AlertChannel, AlertEvent};
use licmon_core::config::MonitorConfig;
use licmon_core::snapshot::UsageSnapshot;

use crate::delivery::email::{EmailConfig, EmailDelivery, EmailError};
use crate::delivery::syslog::{SyslogConfig, SyslogDelivery, SyslogError};
use crate::messages::{self, SYSLOG_ALERT_PREFIX, SYSLOG_REPORT_PREFIX};

/// Error type for notification dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The requested channel is not enabled in the active configuration.
    #[error("Notification channel '{0}' is not enabled")]
    ChannelDisabled(AlertChannel),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Syslog(#[from] SyslogError),
}

/// What happened on one channel when sending a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Disabled,
    /// The channel is enabled but there was nothing to send.
    Skipped,
    Sent,
    Failed,
}

/// Per-channel result of [`NotificationDispatcher::dispatch_report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOutcome {
    pub email: DeliveryStatus,
    pub syslog: DeliveryStatus,
}

/// Ready-to-use email and syslog channels.
#[derive(Debug, Clone, Default)]
pub struct NotificationDispatcher {
    email: Option<EmailDelivery>,
    syslog: Option<SyslogDelivery>,
}

impl NotificationDispatcher {
    /// A dispatcher with every channel disabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build the channels enabled in `config`.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, DispatchError> {
        let email = EmailConfig::from_monitor_config(config)
            .map(EmailDelivery::new)
            .transpose()?;
        let syslog = SyslogConfig::from_monitor_config(config).map(SyslogDelivery::new);

        tracing::debug!(
            email = email.is_some(),
            syslog = syslog.is_some(),
            "Notification channels configured"
        );
        Ok(Self { email, syslog })
    }

    pub fn email_enabled(&self) -> bool {
        self.email.is_some()
    }

    pub fn syslog_enabled(&self) -> bool {
        self.syslog.is_some()
    }

    pub fn is_channel_enabled(&self, channel: AlertChannel) -> bool {
        match channel {
            AlertChannel::Email => self.email_enabled(),
            AlertChannel::Syslog => self.syslog_enabled(),
        }
    }

    /// Send a plain-text email to the configured recipients.
    pub async fn send_email(&self, subject: &str, body: &str) -> Result<(), DispatchError> {
        let email = self
            .email
            .as_ref()
            .ok_or(DispatchError::ChannelDisabled(AlertChannel::Email))?;
        email.send(subject, body).await?;
        Ok(())
    }

    /// Send one syslog datagram.
    pub async fn send_syslog(&self, text: &str) -> Result<(), DispatchError> {
        let syslog = self
            .syslog
            .as_ref()
            .ok_or(DispatchError::ChannelDisabled(AlertChannel::Syslog))?;
        syslog.send(text).await?;
        Ok(())
    }

    /// Deliver `event` on its channel.
    pub async fn dispatch_alert(&self, event: &AlertEvent) -> Result<(), DispatchError> {
        let message = messages::render_alert(event);
        let result = match event.channel {
            AlertChannel::Email => self.send_email(&message.subject, &message.body).await,
            AlertChannel::Syslog => {
                self.send_syslog(&message.syslog_text(SYSLOG_ALERT_PREFIX))
                    .await
            }
        };

        match &result {
            Ok(()) => tracing::info!(
                entity = %event.entity,
                value = event.value,
                threshold = event.threshold,
                channel = %event.channel,
                "License alert sent"
            ),
            Err(e) => tracing::error!(
                entity = %event.entity,
                channel = %event.channel,
                error = %e,
                "Failed to send license alert"
            ),
        }
        result
    }

    /// Send the license summary report of `snapshot` on every enabled
    /// channel. Nothing is sent when the summary has no entries.
    pub async fn dispatch_report(&self, snapshot: &UsageSnapshot) -> ReportOutcome {
        let Some(message) = messages::render_report(snapshot) else {
            tracing::debug!("No license summary entries, skipping usage report");
            let skipped = |channel| {
                if self.is_channel_enabled(channel) {
                    DeliveryStatus::Skipped
                } else {
                    DeliveryStatus::Disabled
                }
            };
            return ReportOutcome {
                email: skipped(AlertChannel::Email),
                syslog: skipped(AlertChannel::Syslog),
            };
        };

        let email = match &self.email {
            None => DeliveryStatus::Disabled,
            Some(email) => match email.send(&message.subject, &message.body).await {
                Ok(()) => DeliveryStatus::Sent,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to email usage report");
                    DeliveryStatus::Failed
                }
            },
        };

        let syslog = match &self.syslog {
            None => DeliveryStatus::Disabled,
            Some(syslog) => match syslog.send(&message.syslog_text(SYSLOG_REPORT_PREFIX)).await {
                Ok(()) => DeliveryStatus::Sent,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to send usage report to syslog");
                    DeliveryStatus::Failed
                }
            },
        };

        tracing::info!(email = ?email, syslog = ?syslog, "Usage report dispatched");
        ReportOutcome { email, syslog }
    }
}
