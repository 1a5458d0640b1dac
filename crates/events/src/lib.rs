//! Notification delivery for license alerts and usage reports.
//!
//! - [`delivery`] : the email (SMTP) and syslog (UDP) channels.
//! - [`messages`] : rendering of alert and report texts.
//! - [`NotificationDispatcher`] : the per-configuration set of ready
//!   channels the poller and the API send through.

pub mod delivery;
pub mod dispatcher;
pub mod messages;

pub use delivery::email::{EmailConfig, EmailDelivery, EmailError, SmtpSecurity};
pub use delivery::syslog::{SyslogConfig, SyslogDelivery, SyslogError};
pub use dispatcher::{DeliveryStatus, DispatchError, NotificationDispatcher, ReportOutcome};
