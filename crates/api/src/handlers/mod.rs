pub mod alerts;
pub mod config;
pub mod license;
