//! Shared types for the offhoursd API

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Tag name/value pair that marks a resource as managed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    pub name: String,
    pub value: String,
}

impl TagFilter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Whether a resource carrying `tags` is managed
    pub fn matches(&self, tags: &HashMap<String, String>) -> bool {
        tags.get(&self.name).is_some_and(|v| v == &self.value)
    }
}

impl std::fmt::Display for TagFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Managed resource kind.
///
/// The declaration order is the display order of a status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Instance,
    Database,
    Cluster,
    AutoScalingGroup,
    Other,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Instance => "instance",
            ResourceKind::Database => "database",
            ResourceKind::Cluster => "cluster",
            ResourceKind::AutoScalingGroup => "auto_scaling_group",
            ResourceKind::Other => "other",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific payload of a resource snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ResourceDetails {
    /// Virtual machine instance
    Instance,
    /// Managed database instance
    Database {
        /// Whether the database is currently deployed across zones
        multi_az: bool,
    },
    /// Managed database cluster
    Cluster,
    /// Group of instances scaled by desired capacity
    AutoScalingGroup {
        /// Instances currently in the group
        size: u32,
        /// Maximum (and "running") desired capacity
        max: u32,
    },
    /// Reported by a backend but not managed by the scheduler
    Other { type_name: String },
}

impl ResourceDetails {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceDetails::Instance => ResourceKind::Instance,
            ResourceDetails::Database { .. } => ResourceKind::Database,
            ResourceDetails::Cluster => ResourceKind::Cluster,
            ResourceDetails::AutoScalingGroup { .. } => ResourceKind::AutoScalingGroup,
            ResourceDetails::Other { .. } => ResourceKind::Other,
        }
    }
}

/// Immutable snapshot of one managed cloud resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Stable provider identifier
    pub id: String,

    /// Human-readable label, falls back to the id
    pub name: String,

    /// Provider-reported status, e.g. "running" or "available (Multi-AZ)"
    pub state: String,

    /// Provider-specific readiness predicate
    pub is_available: bool,

    #[serde(flatten)]
    pub details: ResourceDetails,
}

impl Resource {
    pub fn new(
        id: impl Into<String>,
        name: Option<String>,
        state: impl Into<String>,
        is_available: bool,
        details: ResourceDetails,
    ) -> Self {
        let id = id.into();
        let name = name.filter(|n| !n.is_empty()).unwrap_or_else(|| id.clone());
        Self {
            id,
            name,
            state: state.into(),
            is_available,
            details,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.details.kind()
    }

    /// Copy of this snapshot carrying a different state label
    pub fn with_state(&self, state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            ..self.clone()
        }
    }

    /// Ordering used for status snapshots: by kind, then by name
    pub fn display_order(&self, other: &Self) -> Ordering {
        self.kind()
            .cmp(&other.kind())
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Sort resources in display order
pub fn sort_resources(resources: &mut [Resource]) {
    resources.sort_by(Resource::display_order);
}

/// Read-only scheduler snapshot sent to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Current time, localized for display
    pub clock: String,

    /// Whether an extension is currently offered
    pub can_extend: bool,

    /// Remaining uptime, empty when resources should be stopped
    pub remaining: String,

    /// Description of the weekday auto-start rule
    pub weekday_start_message: String,

    /// Cached resources in display order
    pub resources: Vec<Resource>,
}
