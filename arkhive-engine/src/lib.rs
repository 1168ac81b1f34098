//! Boots the launcher's subsystems and keeps the frontend's settings
//! file in sync with the defaults this launcher wants.

pub mod config;
pub mod controller;

pub use config::{default_settings, sync, ConfigError};
pub use controller::{Controller, LoggingSink, StartupSink, Subsystem};
