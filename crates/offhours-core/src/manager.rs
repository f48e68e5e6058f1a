//! Reconciliation manager
//!
//! All scheduler state lives in a single `Manager` owned by one task.
//! Callers talk to it through a `ManagerHandle`, which queues commands that
//! are processed strictly one at a time in arrival order.

use offhours_api::{PENDING_STATE, Resource, ResourceDetails, Status, sort_resources};
use offhours_config::ScheduleConfig;
use offhours_provider::ResourceProvider;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{
    CoreError, CoreResult, UptimeWindow, format_clock, last_scheduled_millis,
    weekday_start_message,
};

/// Source of the current time in epoch milliseconds
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// State owned by the manager
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerState {
    /// Start of the current (or most recent) uptime window
    pub last_started: i64,

    /// Resources seen by the previous pass, in display order
    pub cached_resources: Vec<Resource>,
}

/// Reconciliation action for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
}

/// Decide what to do with a resource given whether the window is open.
///
/// Returns None for resources already in the desired state and for
/// unsupported kinds.
pub fn plan_action(running: bool, resource: &Resource) -> Option<Action> {
    let (needs_start, needs_stop) = match &resource.details {
        ResourceDetails::Instance => (resource.state == "stopped", resource.state == "running"),
        ResourceDetails::AutoScalingGroup { size, max } => (size != max, *size > 0),
        ResourceDetails::Database { .. } => (!resource.is_available, resource.is_available),
        ResourceDetails::Cluster => (resource.state == "stopped", resource.is_available),
        ResourceDetails::Other { .. } => return None,
    };

    if running && needs_start {
        Some(Action::Start)
    } else if !running && needs_stop {
        Some(Action::Stop)
    } else {
        None
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSummary {
    pub running: bool,
    pub actions: usize,
    pub resources: usize,
}

/// Owner of the scheduler state
pub struct Manager {
    provider: ResourceProvider,
    schedule: ScheduleConfig,
    window: UptimeWindow,
    state: SchedulerState,
    clock: Clock,
}

impl Manager {
    /// Create a manager, loading the persisted window start
    pub async fn new(provider: ResourceProvider, schedule: ScheduleConfig) -> Self {
        let last_started = provider.get_last_started().await;
        let window = UptimeWindow::new(schedule.uptime_window_hours);

        info!(
            last_started,
            time_zone = %schedule.time_zone,
            weekday_start = ?schedule.weekday_start,
            window_hours = window.hours(),
            "Scheduler manager initialized"
        );

        Self {
            provider,
            schedule,
            window,
            state: SchedulerState {
                last_started,
                cached_resources: Vec::new(),
            },
            clock: Arc::new(offhours_util::now_millis),
        }
    }

    /// Replace the clock used by the command loop
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Run one reconciliation pass.
    ///
    /// Actions are planned against the resources cached by the previous
    /// pass, then the cache is refreshed from the provider.
    pub async fn update(&mut self, now: i64) -> UpdateSummary {
        let tz = self.schedule.time_zone;
        let scheduled = last_scheduled_millis(self.schedule.weekday_start, now, &tz);
        if scheduled > self.state.last_started {
            self.state.last_started = scheduled;
            self.provider.set_last_started(scheduled).await;
            info!(
                started_at = %format_clock(scheduled, &tz),
                "Scheduled start of uptime window"
            );
        }

        let running = self.window.is_running(self.state.last_started, now);
        let mut actions = 0;
        for resource in &self.state.cached_resources {
            if let ResourceDetails::Other { type_name } = &resource.details {
                error!(
                    id = %resource.id,
                    type_name = %type_name,
                    "Invalid resource type, skipping"
                );
                continue;
            }

            if let Some(action) = plan_action(running, resource) {
                self.apply(action, resource).await;
                actions += 1;
            }
        }

        let mut resources = self.provider.list_all().await;
        sort_resources(&mut resources);
        self.state.cached_resources = resources;

        let summary = UpdateSummary {
            running,
            actions,
            resources: self.state.cached_resources.len(),
        };
        debug!(
            running = summary.running,
            actions = summary.actions,
            resources = summary.resources,
            "Reconciliation pass complete"
        );
        summary
    }

    async fn apply(&self, action: Action, resource: &Resource) {
        match (action, &resource.details) {
            (Action::Start, ResourceDetails::Instance) => {
                self.provider.start_instance(resource).await
            }
            (Action::Stop, ResourceDetails::Instance) => {
                self.provider.stop_instance(resource).await
            }
            (Action::Start, ResourceDetails::AutoScalingGroup { .. }) => {
                self.provider.start_auto_scaling_group(resource).await
            }
            (Action::Stop, ResourceDetails::AutoScalingGroup { .. }) => {
                self.provider.stop_auto_scaling_group(resource).await
            }
            (Action::Start, ResourceDetails::Database { .. }) => {
                self.provider.start_database(resource).await
            }
            (Action::Stop, ResourceDetails::Database { .. }) => {
                self.provider.stop_database(resource).await
            }
            (Action::Start, ResourceDetails::Cluster) => {
                self.provider.start_cluster(resource).await
            }
            (Action::Stop, ResourceDetails::Cluster) => {
                self.provider.stop_cluster(resource).await
            }
            (_, ResourceDetails::Other { .. }) => {}
        }
    }

    /// Status snapshot; does not touch the provider
    pub fn status(&self, now: i64) -> Status {
        let tz = self.schedule.time_zone;
        let last_started = self.state.last_started;

        Status {
            clock: format_clock(now, &tz),
            can_extend: self.window.can_extend(last_started, now),
            remaining: self.window.remaining(last_started, now),
            weekday_start_message: weekday_start_message(self.schedule.weekday_start, now, &tz),
            resources: self.state.cached_resources.clone(),
        }
    }

    /// Extend the window by one hour and mark every cached resource pending
    pub async fn extend(&mut self, now: i64) -> Status {
        self.state.cached_resources = self
            .state
            .cached_resources
            .iter()
            .map(|r| r.with_state(PENDING_STATE))
            .collect();

        let previous = self.state.last_started;
        self.state.last_started = self.window.extend(previous, now);
        self.provider.set_last_started(self.state.last_started).await;

        info!(
            previous,
            last_started = self.state.last_started,
            "Extending uptime window by 1 hour"
        );
        self.status(now)
    }
}

/// Commands accepted by the manager task
#[derive(Debug)]
pub enum Command {
    Update,
    GetStatus(oneshot::Sender<Status>),
    Extend(oneshot::Sender<Status>),
}

/// Cloneable handle to the manager task
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ManagerHandle {
    /// Queue a reconciliation pass without waiting for it
    pub fn update(&self) -> CoreResult<()> {
        self.tx
            .send(Command::Update)
            .map_err(|_| CoreError::ManagerStopped)
    }

    /// Status after all previously queued commands
    pub async fn status(&self) -> CoreResult<Status> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::GetStatus(reply))
            .map_err(|_| CoreError::ManagerStopped)?;
        rx.await.map_err(|_| CoreError::ManagerStopped)
    }

    /// Extend the window and return the resulting status
    pub async fn extend(&self) -> CoreResult<Status> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Extend(reply))
            .map_err(|_| CoreError::ManagerStopped)?;
        rx.await.map_err(|_| CoreError::ManagerStopped)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Move the manager onto its own task.
///
/// The task ends once every handle has been dropped.
pub fn spawn_manager(manager: Manager) -> (ManagerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_manager(manager, rx));
    (ManagerHandle { tx }, task)
}

async fn run_manager(mut manager: Manager, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        let now = manager.now();
        match command {
            Command::Update => {
                manager.update(now).await;
            }
            Command::GetStatus(reply) => {
                let _ = reply.send(manager.status(now));
            }
            Command::Extend(reply) => {
                let status = manager.extend(now).await;
                let _ = reply.send(status);
            }
        }
    }

    info!("Scheduler manager stopped");
}
