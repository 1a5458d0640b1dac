//! Controller session client.
//!
//! Defines the [`DeviceSessionClient`] seam the poller drives
//! (authenticate, run show commands, log out), the Aruba REST
//! implementation [`ArubaClient`], and [`collect_license_usage`], which
//! runs the login → usage → summary → logout sequence of one poll cycle.

pub mod aruba;
pub mod collect;
pub mod error;
pub mod session;

pub use aruba::{ArubaClient, ArubaClientConfig};
pub use collect::{collect_license_usage, ControllerTarget, PRIMARY_COMMAND, SUMMARY_COMMAND};
pub use error::ControllerError;
pub use session::{DeviceSessionClient, Session};
