//! offhoursd - The office hours scheduler service
//!
//! This is the main entry point for the offhoursd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Resource provider (simulated backend)
//! - Scheduler manager and reconciliation ticker
//! - HTTP server

use anyhow::{Context, Result};
use clap::Parser;
use offhours_config::{SchedulerConfig, SimulatedResource, load_config};
use offhours_core::{Manager, ManagerHandle, Ticker, spawn_manager};
use offhours_http::HttpServer;
use offhours_provider::{MockBackend, MockResource, ResourceProvider};
use offhours_store::{SqliteStore, Store};
use offhours_util::default_config_path;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How long to wait for the manager to drain after the server stops
const MANAGER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// offhoursd - Keeps tagged cloud resources running only during office hours
#[derive(Parser, Debug)]
#[command(name = "offhoursd")]
#[command(about = "Keeps tagged cloud resources running only during office hours", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/offhours/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set OFFHOURS_DATA_DIR env var)
    #[arg(short, long, env = "OFFHOURS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// HTTP listen address override (or set OFFHOURS_LISTEN env var)
    #[arg(long, env = "OFFHOURS_LISTEN")]
    listen: Option<SocketAddr>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

/// Build the simulated backend inventory from configuration
fn simulated_backend(resources: &[SimulatedResource]) -> MockBackend {
    MockBackend::with_resources(resources.iter().map(|r| {
        let mut resource = MockResource::new(r.id.clone(), r.state.clone(), r.details.clone());
        resource.name = r.name.clone();
        resource.tags = r.tags.clone();
        resource
    }))
}

/// Main service state
struct Service {
    handle: ManagerHandle,
    manager_task: JoinHandle<()>,
    server: HttpServer,
    tick_interval: Duration,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        // Load configuration
        let mut config: SchedulerConfig = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        if let Some(data_dir) = &args.data_dir {
            config.service.data_dir = data_dir.clone();
        }
        if let Some(listen) = args.listen {
            config.service.listen_addr = listen;
        }

        info!(
            config_path = %args.config.display(),
            time_zone = %config.schedule.time_zone,
            weekday_start = ?config.schedule.weekday_start,
            window_hours = config.schedule.uptime_window_hours,
            tag = %config.discovery,
            "Configuration loaded"
        );

        if offhours_util::is_mock_time_active() {
            warn!(
                now = %offhours_util::now(),
                "Mock time is active, schedules follow {}",
                offhours_util::MOCK_TIME_ENV_VAR
            );
        }

        // Create data directory
        let data_dir = &config.service.data_dir;
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        // Initialize store
        let db_path = data_dir.join("offhoursd.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        // Initialize provider
        let backend = simulated_backend(&config.simulated);
        info!(
            resource_count = config.simulated.len(),
            "Simulated backend initialized"
        );

        let provider = ResourceProvider::new(
            Arc::new(backend),
            store,
            config.discovery.clone(),
            config.store.last_started_key.clone(),
        )
        .with_multi_az(config.provider.use_multi_az)
        .with_call_timeout(config.service.call_timeout);

        // Initialize manager
        let manager = Manager::new(provider, config.schedule.clone()).await;
        let (handle, manager_task) = spawn_manager(manager);

        // Bind HTTP server
        let server = HttpServer::bind(config.service.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.service.listen_addr))?;

        Ok(Self {
            handle,
            manager_task,
            server,
            tick_interval: config.service.tick_interval,
        })
    }

    async fn run(self) -> Result<()> {
        let Self {
            handle,
            manager_task,
            server,
            tick_interval,
        } = self;

        let mut ticker = Ticker::spawn(handle.clone(), tick_interval);

        // Set up signal handlers
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to set up SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to set up SIGINT handler")?;

        let shutdown = async move {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down");
                }
            }
        };

        info!("Service running");
        let served = server.run(handle, shutdown).await;

        ticker.stop();
        if tokio::time::timeout(MANAGER_DRAIN_TIMEOUT, manager_task)
            .await
            .is_err()
        {
            warn!("Manager did not stop in time");
        }

        served.context("HTTP server failed")?;
        info!("Service stopped");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "offhoursd starting"
    );

    // Create and run the service
    let service = Service::new(&args).await?;
    service.run().await
}
