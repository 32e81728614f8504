//! # scanlink-core
//!
//! Core logic for scanlink: timed Bluetooth LE scan sessions and merging of
//! discovered peripherals.
//!
//! This crate provides:
//! - Scan sessions with an optional timeout that never stops a newer scan
//! - One merged record per discovered device, emitted on every update
//! - Radio driver abstraction with BlueZ and in-memory implementations
//! - Configuration management
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`controller`] - Scan start/stop, deferred timeout stop, session tracking
//! - [`registry`] - Create-or-merge peripheral records and emit them
//! - [`session`] - Monotonic session identifiers used to detect stale actions
//! - [`driver`] - Radio driver and discovery handler traits
//! - [`events`] - Events handed to the host application and event sinks
//! - [`advertising`] - Packing of parsed advertisement fields into AD structures
//! - [`mock`] - Scriptable in-memory radio
//! - `bluez` - BlueZ radio driver (feature `bluetooth`)
//! - [`config`] - Configuration loading, saving, and validation
//! - [`error`] - Error types for the crate
//! - [`types`] - Shared types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod advertising;
#[cfg(feature = "bluetooth")]
pub mod bluez;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod events;
pub mod mock;
pub mod registry;
pub mod session;
pub mod types;

// Re-export primary types for convenience
#[cfg(feature = "bluetooth")]
pub use crate::bluez::BluezDriver;
pub use crate::config::{
    default_config_path, ConfigError, ConfigResult, LoggingConfig, ScanDefaults, ScanlinkConfig,
    ServerConfig,
};
pub use crate::controller::ScanController;
pub use crate::driver::{Advertisement, DiscoveryHandler, DriverError, DriverResult, RadioDriver};
pub use crate::error::{Result, ScanError, ScanlinkError};
pub use crate::events::{BroadcastSink, EventSink, ScanEvent, PERIPHERAL_DISCOVERED, SCAN_STOPPED};
pub use crate::mock::MockRadio;
pub use crate::registry::{DiscoveryRegistry, Peripheral};
pub use crate::session::{SessionCounter, SessionId};
pub use crate::types::{
    is_valid_mac_address, DeviceIdentity, MatchMode, PeripheralView, RadioState, ScanMode,
    ScanOptions, ScanRequest, ScanStatus,
};
