//! Configuration parsing and validation for offhoursd
//!
//! The TOML file is read into `Raw*` structs, checked as a whole by
//! `validate_config` (every problem is reported, not just the first), then
//! converted into a `SchedulerConfig` with defaults filled in. Sections:
//! `[service]`, `[schedule]`, `[discovery]`, `[store]`, `[provider]` and the
//! `[[simulated]]` inventory.

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("{} invalid setting(s): {}", .errors.len(), join_errors(.errors))]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("config_version {0} is not supported (expected {expected})", expected = CURRENT_CONFIG_VERSION)]
    UnsupportedVersion(u32),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Read, validate and convert the configuration file at `path`
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<SchedulerConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Validate and convert configuration text
pub fn parse_config(content: &str) -> ConfigResult<SchedulerConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    match validate_config(&raw).as_slice() {
        [] => Ok(SchedulerConfig::from_raw(raw)),
        errors => Err(ConfigError::ValidationFailed {
            errors: errors.to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_minimal_config() {
        let config = parse_config("config_version = 1").unwrap();
        assert_eq!(config.schedule.uptime_window_hours, DEFAULT_UPTIME_WINDOW_HOURS);
        assert_eq!(config.schedule.weekday_start, None);
        assert_eq!(config.discovery.name, DEFAULT_TAG_NAME);
        assert_eq!(config.discovery.value, DEFAULT_TAG_VALUE);
        assert_eq!(config.store.last_started_key, DEFAULT_LAST_STARTED_KEY);
        assert!(!config.provider.use_multi_az);
        assert!(config.simulated.is_empty());
    }

    #[test]
    fn reject_wrong_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_values() {
        let config = r#"
            config_version = 1

            [schedule]
            time_zone = "Mars/Olympus_Mons"
            weekday_start = 24
            uptime_window_hours = 0
        "#;

        match parse_config(config) {
            Err(ConfigError::ValidationFailed { errors }) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            config_version = 1

            [schedule]
            time_zone = "Australia/Melbourne"
            weekday_start = 8
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.schedule.weekday_start, Some(8));
        assert_eq!(config.schedule.time_zone, chrono_tz::Australia::Melbourne);
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = load_config("/nonexistent/offhours/config.toml");
        match result {
            Err(ConfigError::ReadError { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/offhours/config.toml"))
            }
            other => panic!("expected read error, got {:?}", other),
        }
    }

    #[test]
    fn validation_error_lists_every_problem() {
        let err = parse_config(
            r#"
            config_version = 1

            [schedule]
            weekday_start = 30
            uptime_window_hours = 0
            "#,
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("2 invalid setting(s): "), "{}", message);
        assert!(message.contains("; "), "{}", message);
    }
}
