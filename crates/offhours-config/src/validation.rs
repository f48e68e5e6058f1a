//! Configuration validation

use crate::schema::{RawConfig, RawResourceKind, RawSimulatedResource};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Unknown time zone '{0}'")]
    UnknownTimeZone(String),

    #[error("weekday_start must be between 0 and 23, got {0}")]
    InvalidStartHour(u32),

    #[error("uptime_window_hours must be between 1 and 24, got {0}")]
    InvalidUptimeWindow(u32),

    #[error("Invalid listen address '{value}': {message}")]
    InvalidListenAddr { value: String, message: String },

    #[error("Simulated resource '{id}': {message}")]
    ResourceError { id: String, message: String },

    #[error("Duplicate simulated resource ID: {0}")]
    DuplicateResourceId(String),

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(addr) = &config.service.listen_addr
        && let Err(e) = addr.parse::<SocketAddr>()
    {
        errors.push(ValidationError::InvalidListenAddr {
            value: addr.clone(),
            message: e.to_string(),
        });
    }

    if config.service.tick_seconds == Some(0) {
        errors.push(ValidationError::GlobalError(
            "tick_seconds must be greater than 0".into(),
        ));
    }

    if config.service.call_timeout_seconds == Some(0) {
        errors.push(ValidationError::GlobalError(
            "call_timeout_seconds must be greater than 0".into(),
        ));
    }

    if let Some(zone) = &config.schedule.time_zone
        && zone.parse::<Tz>().is_err()
    {
        errors.push(ValidationError::UnknownTimeZone(zone.clone()));
    }

    if let Some(hour) = config.schedule.weekday_start
        && hour > 23
    {
        errors.push(ValidationError::InvalidStartHour(hour));
    }

    if let Some(hours) = config.schedule.uptime_window_hours
        && !(1..=24).contains(&hours)
    {
        errors.push(ValidationError::InvalidUptimeWindow(hours));
    }

    if let Some(name) = &config.discovery.tag_name
        && name.trim().is_empty()
    {
        errors.push(ValidationError::GlobalError("tag_name cannot be empty".into()));
    }

    if let Some(key) = &config.store.last_started_key
        && key.trim().is_empty()
    {
        errors.push(ValidationError::GlobalError(
            "last_started_key cannot be empty".into(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for resource in &config.simulated {
        if !seen_ids.insert(&resource.id) {
            errors.push(ValidationError::DuplicateResourceId(resource.id.clone()));
        }
        errors.extend(validate_simulated(resource));
    }

    errors
}

fn validate_simulated(resource: &RawSimulatedResource) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if resource.id.trim().is_empty() {
        errors.push(ValidationError::ResourceError {
            id: resource.id.clone(),
            message: "id cannot be empty".into(),
        });
    }

    match resource.kind {
        RawResourceKind::AutoScalingGroup => {
            let size = resource.size.unwrap_or(0);
            let max = resource.max.unwrap_or(0);
            if size > max {
                errors.push(ValidationError::ResourceError {
                    id: resource.id.clone(),
                    message: format!("size {} exceeds max {}", size, max),
                });
            }
        }
        _ => {
            if resource.size.is_some() || resource.max.is_some() {
                errors.push(ValidationError::ResourceError {
                    id: resource.id.clone(),
                    message: "size and max only apply to auto scaling groups".into(),
                });
            }
        }
    }

    if resource.multi_az && resource.kind != RawResourceKind::Database {
        errors.push(ValidationError::ResourceError {
            id: resource.id.clone(),
            message: "multi_az only applies to databases".into(),
        });
    }

    errors
}
