//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Uptime schedule
    #[serde(default)]
    pub schedule: RawSchedule,

    /// Which resources are managed
    #[serde(default)]
    pub discovery: RawDiscovery,

    /// Where the last start timestamp is persisted
    #[serde(default)]
    pub store: RawStore,

    /// Provider behavior
    #[serde(default)]
    pub provider: RawProvider,

    /// Inventory served by the simulated backend
    #[serde(default)]
    pub simulated: Vec<RawSimulatedResource>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// HTTP listen address (default: 0.0.0.0:8080)
    pub listen_addr: Option<String>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// Reconciliation interval in seconds (default: 30)
    pub tick_seconds: Option<u64>,

    /// Deadline for each provider call in seconds (default: 20)
    pub call_timeout_seconds: Option<u64>,
}

/// Uptime schedule
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSchedule {
    /// IANA time zone name (default: UTC)
    pub time_zone: Option<String>,

    /// Hour (0-23) at which resources start automatically on weekdays.
    /// Absent disables the automatic start.
    pub weekday_start: Option<u32>,

    /// Hours resources stay up after a start (default: 10)
    pub uptime_window_hours: Option<u32>,
}

/// Resource discovery tag
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDiscovery {
    pub tag_name: Option<String>,
    pub tag_value: Option<String>,
}

/// Store settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawStore {
    /// Key under which the last start timestamp is kept
    pub last_started_key: Option<String>,
}

/// Provider behavior
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawProvider {
    /// Require databases to run Multi-AZ while the window is open
    #[serde(default)]
    pub use_multi_az: bool,
}

/// Resource kinds accepted in the simulated inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawResourceKind {
    Instance,
    Database,
    Cluster,
    AutoScalingGroup,
}

/// One resource in the simulated inventory
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSimulatedResource {
    pub id: String,

    pub name: Option<String>,

    pub kind: RawResourceKind,

    /// Initial provider state label (default: "stopped")
    pub state: Option<String>,

    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Databases only
    #[serde(default)]
    pub multi_az: bool,

    /// Auto scaling groups only: current instance count
    pub size: Option<u32>,

    /// Auto scaling groups only: maximum instance count
    pub max: Option<u32>,
}
