//! Periodic reconciliation trigger

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::ManagerHandle;

/// Default period between reconciliation passes
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Sends `Update` to the manager on a fixed period.
///
/// The first pass is queued immediately. The ticker stops when `stop` is
/// called, when it is dropped, or when the manager goes away.
pub struct Ticker {
    task: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(manager: ManagerHandle, period: Duration) -> Self {
        info!(period_secs = period.as_secs_f64(), "Starting reconciliation ticker");

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if manager.update().is_err() {
                    debug!("Manager stopped, ticker exiting");
                    break;
                }
            }
        });

        Self { task: Some(task) }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Reconciliation ticker stopped");
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
