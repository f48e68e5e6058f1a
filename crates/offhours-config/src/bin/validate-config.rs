//! Config validation CLI tool
//!
//! Validates an offhoursd configuration file and reports any errors.

use offhours_api::ResourceDetails;
use offhours_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates an offhoursd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match offhours_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", offhours_config::CURRENT_CONFIG_VERSION);
            println!("  Time zone: {}", config.schedule.time_zone.name());
            match config.schedule.weekday_start {
                Some(hour) => println!("  Weekday auto start: {:02}:00", hour),
                None => println!("  Weekday auto start: disabled"),
            }
            println!("  Uptime window: {}h", config.schedule.uptime_window_hours);
            println!("  Discovery tag: {}", config.discovery);
            println!("  Multi-AZ required: {}", config.provider.use_multi_az);
            println!("  Simulated resources: {}", config.simulated.len());

            if !config.simulated.is_empty() {
                println!();
                println!("Simulated resources:");
                for resource in &config.simulated {
                    let kind_str = match &resource.details {
                        ResourceDetails::AutoScalingGroup { size, max } => {
                            format!("{} ({}/{})", resource.details.kind(), size, max)
                        }
                        ResourceDetails::Database { multi_az: true } => {
                            format!("{} (Multi-AZ)", resource.details.kind())
                        }
                        other => other.kind().to_string(),
                    };
                    let managed = if config.discovery.matches(&resource.tags) {
                        "managed"
                    } else {
                        "untagged"
                    };
                    println!(
                        "  - {} [{}]: {}, {}",
                        resource.id, kind_str, resource.state, managed
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                offhours_config::ConfigError::ReadError { source, .. } => {
                    eprintln!("Failed to read file: {}", source);
                }
                offhours_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                offhours_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                offhours_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        offhours_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
