//! External delivery channels for license notifications.
//!
//! Both channels are fire-and-forget: a failed send is reported to the
//! caller once and never retried here.

pub mod email;
pub mod syslog;
