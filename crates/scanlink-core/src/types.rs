//! Shared types and OpenAPI schemas.
//!
//! This module contains types that cross module boundaries: device identities,
//! scan requests and options, radio state, and the read-only peripheral view
//! handed to event sinks and HTTP callers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::session::SessionId;

static MAC_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$").expect("MAC address regex is valid")
});

/// Returns `true` if `value` is a colon-separated Bluetooth MAC address.
#[must_use]
pub fn is_valid_mac_address(value: &str) -> bool {
    MAC_ADDRESS_RE.is_match(value)
}

/// Stable identity of a discovered device.
///
/// On BlueZ this is the device MAC address; other platforms hand out opaque
/// identifier tokens, so no format is enforced here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "AA:BB:CC:DD:EE:FF")]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Wrap a platform address or identity token.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identity is a MAC address rather than a platform token.
    #[must_use]
    pub fn is_mac_address(&self) -> bool {
        is_valid_mac_address(&self.0)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceIdentity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Power state of the radio as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RadioState {
    /// Adapter present and powered.
    On,
    /// Adapter present but powered off.
    Off,
    /// No adapter, or the Bluetooth daemon cannot be reached.
    Unavailable,
}

impl fmt::Display for RadioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Unavailable => "unavailable",
        };
        f.write_str(name)
    }
}

/// How aggressively the controller matches advertisements against filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Report a match after few sightings, even with weak signal.
    #[default]
    Aggressive,
    /// Require more sightings and a stronger signal before reporting.
    Sticky,
}

impl MatchMode {
    /// Numeric code used in configuration files.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Aggressive => 1,
            Self::Sticky => 2,
        }
    }

    /// Parse a numeric configuration code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Aggressive),
            2 => Some(Self::Sticky),
            _ => None,
        }
    }
}

/// Radio duty cycle requested for the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Only listen while other scans are running.
    Opportunistic,
    /// Lowest duty cycle.
    #[default]
    LowPower,
    /// Balance between latency and power.
    Balanced,
    /// Highest duty cycle.
    LowLatency,
}

impl ScanMode {
    /// Numeric code used in configuration files.
    #[must_use]
    pub const fn code(self) -> i8 {
        match self {
            Self::Opportunistic => -1,
            Self::LowPower => 0,
            Self::Balanced => 1,
            Self::LowLatency => 2,
        }
    }

    /// Parse a numeric configuration code.
    #[must_use]
    pub const fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(Self::Opportunistic),
            0 => Some(Self::LowPower),
            1 => Some(Self::Balanced),
            2 => Some(Self::LowLatency),
            _ => None,
        }
    }
}

/// Platform tuning knobs forwarded to the radio driver untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ScanOptions {
    /// Advertisements per filter the hardware should match (1-3).
    #[schema(example = 3, minimum = 1, maximum = 3)]
    pub number_of_matches: u8,

    /// Filter match mode.
    pub match_mode: MatchMode,

    /// Radio duty cycle.
    pub scan_mode: ScanMode,

    /// Batch delay for results in milliseconds; 0 reports immediately.
    #[schema(example = 0)]
    pub report_delay_ms: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            number_of_matches: 3,
            match_mode: MatchMode::Aggressive,
            scan_mode: ScanMode::LowPower,
            report_delay_ms: 0,
        }
    }
}

/// Arguments of a single scan start.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ScanRequest {
    /// Only report peripherals advertising one of these services.
    /// Empty means no filtering.
    pub service_uuids: Vec<Uuid>,

    /// Stop the scan automatically after this many seconds; 0 scans until stopped.
    #[schema(example = 5)]
    pub timeout_secs: u32,

    /// Ask the radio to report repeated advertisements from the same device.
    pub allow_duplicates: bool,

    /// Platform tuning knobs.
    pub options: ScanOptions,
}

impl ScanRequest {
    /// An unfiltered scan with the given timeout and default options.
    #[must_use]
    pub fn with_timeout(timeout_secs: u32) -> Self {
        Self {
            timeout_secs,
            ..Self::default()
        }
    }

    /// Replace the service filter list.
    #[must_use]
    pub fn with_services(mut self, service_uuids: impl IntoIterator<Item = Uuid>) -> Self {
        self.service_uuids = service_uuids.into_iter().collect();
        self
    }

    /// Whether the caller asked for service filtering.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !self.service_uuids.is_empty()
    }
}

/// Read-only snapshot of a peripheral record, as emitted to event sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "AA:BB:CC:DD:EE:FF",
    "name": "Heart Rate Strap",
    "rssi": -55,
    "advertising": [2, 3],
    "attributes": {},
    "first_seen_utc": "2025-01-15T03:30:00Z",
    "last_seen_utc": "2025-01-15T03:30:02Z",
    "times_seen": 2
}))]
pub struct PeripheralView {
    /// Device identity.
    pub id: DeviceIdentity,

    /// Advertised local name, if any advertisement carried one.
    pub name: Option<String>,

    /// Latest signal strength in dBm.
    #[schema(example = -55)]
    pub rssi: i16,

    /// Latest raw advertisement payload.
    pub advertising: Vec<u8>,

    /// Metadata attached by other components; never touched by discovery merges.
    pub attributes: BTreeMap<String, String>,

    /// When the device was first seen (UTC).
    pub first_seen_utc: DateTime<Utc>,

    /// When the latest advertisement was merged (UTC).
    pub last_seen_utc: DateTime<Utc>,

    /// Number of advertisements merged into this record.
    pub times_seen: u64,
}

/// Snapshot of the controller's scan state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScanStatus {
    /// Whether a scan is currently running.
    pub scanning: bool,

    /// Latest session identifier handed out.
    pub session_id: SessionId,

    /// When the running scan was started.
    pub started_at_utc: Option<DateTime<Utc>>,

    /// Timeout of the running scan in seconds (0 = none).
    pub timeout_secs: Option<u32>,
}
