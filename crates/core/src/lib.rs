//! Domain types and pure logic for the license monitor.
//!
//! Nothing in this crate performs I/O: configuration and snapshot types,
//! the alert model and the threshold evaluator live here so they can be
//! tested in isolation and shared by the poller, the notification
//! dispatcher and the HTTP API.

pub mod alert;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod snapshot;
pub mod types;
