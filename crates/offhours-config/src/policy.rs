//! Validated scheduler configuration

use crate::schema::{
    RawConfig, RawDiscovery, RawProvider, RawResourceKind, RawSchedule, RawServiceConfig,
    RawSimulatedResource, RawStore,
};
use chrono_tz::Tz;
use offhours_api::{ResourceDetails, TagFilter};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TICK_SECONDS: u64 = 30;
pub const DEFAULT_CALL_TIMEOUT_SECONDS: u64 = 20;
pub const DEFAULT_UPTIME_WINDOW_HOURS: u32 = 10;
pub const DEFAULT_TAG_NAME: &str = "scheduler-enabled";
pub const DEFAULT_TAG_VALUE: &str = "true";
pub const DEFAULT_LAST_STARTED_KEY: &str = "/scheduler/lastStarted";
pub const DEFAULT_SIMULATED_STATE: &str = "stopped";

/// Validated configuration ready for use by the service
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub service: ServiceConfig,
    pub schedule: ScheduleConfig,
    pub discovery: TagFilter,
    pub store: StoreConfig,
    pub provider: ProviderConfig,
    pub simulated: Vec<SimulatedResource>,
}

impl SchedulerConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            schedule: ScheduleConfig::from_raw(raw.schedule),
            discovery: tag_filter_from_raw(raw.discovery),
            store: StoreConfig::from_raw(raw.store),
            provider: ProviderConfig::from_raw(raw.provider),
            simulated: raw.simulated.into_iter().map(SimulatedResource::from_raw).collect(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            schedule: ScheduleConfig::default(),
            discovery: TagFilter::new(DEFAULT_TAG_NAME, DEFAULT_TAG_VALUE),
            store: StoreConfig::default(),
            provider: ProviderConfig::default(),
            simulated: Vec::new(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub tick_interval: Duration,
    pub call_timeout: Duration,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: raw
                .listen_addr
                .and_then(|a| a.parse().ok())
                .unwrap_or(defaults.listen_addr),
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            tick_interval: raw
                .tick_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.tick_interval),
            call_timeout: raw
                .call_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.call_timeout),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            data_dir: offhours_util::default_data_dir(),
            tick_interval: Duration::from_secs(DEFAULT_TICK_SECONDS),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECONDS),
        }
    }
}

/// Uptime schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub time_zone: Tz,

    /// Weekday auto-start hour; None disables the automatic start
    pub weekday_start: Option<u8>,

    pub uptime_window_hours: u32,
}

impl ScheduleConfig {
    fn from_raw(raw: RawSchedule) -> Self {
        Self {
            time_zone: raw
                .time_zone
                .and_then(|z| z.parse().ok())
                .unwrap_or(Tz::UTC),
            weekday_start: raw
                .weekday_start
                .filter(|h| *h <= 23)
                .and_then(|h| u8::try_from(h).ok()),
            uptime_window_hours: raw
                .uptime_window_hours
                .unwrap_or(DEFAULT_UPTIME_WINDOW_HOURS),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time_zone: Tz::UTC,
            weekday_start: None,
            uptime_window_hours: DEFAULT_UPTIME_WINDOW_HOURS,
        }
    }
}

fn tag_filter_from_raw(raw: RawDiscovery) -> TagFilter {
    TagFilter::new(
        raw.tag_name.unwrap_or_else(|| DEFAULT_TAG_NAME.into()),
        raw.tag_value.unwrap_or_else(|| DEFAULT_TAG_VALUE.into()),
    )
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub last_started_key: String,
}

impl StoreConfig {
    fn from_raw(raw: RawStore) -> Self {
        Self {
            last_started_key: raw
                .last_started_key
                .unwrap_or_else(|| DEFAULT_LAST_STARTED_KEY.into()),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            last_started_key: DEFAULT_LAST_STARTED_KEY.into(),
        }
    }
}

/// Provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub use_multi_az: bool,
}

impl ProviderConfig {
    fn from_raw(raw: RawProvider) -> Self {
        Self {
            use_multi_az: raw.use_multi_az,
        }
    }
}

/// Inventory item for the simulated backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedResource {
    pub id: String,
    pub name: Option<String>,
    pub state: String,
    pub tags: HashMap<String, String>,
    pub details: ResourceDetails,
}

impl SimulatedResource {
    fn from_raw(raw: RawSimulatedResource) -> Self {
        let details = match raw.kind {
            RawResourceKind::Instance => ResourceDetails::Instance,
            RawResourceKind::Database => ResourceDetails::Database {
                multi_az: raw.multi_az,
            },
            RawResourceKind::Cluster => ResourceDetails::Cluster,
            RawResourceKind::AutoScalingGroup => ResourceDetails::AutoScalingGroup {
                size: raw.size.unwrap_or(0),
                max: raw.max.unwrap_or(0),
            },
        };

        Self {
            id: raw.id,
            name: raw.name,
            state: raw.state.unwrap_or_else(|| DEFAULT_SIMULATED_STATE.into()),
            tags: raw.tags,
            details,
        }
    }
}
