//! Uptime window arithmetic and reconciliation for offhoursd
//!
//! This crate is the heart of offhoursd, containing:
//! - Window arithmetic (weekday auto-start, remaining time, extensions)
//! - The manager: a single actor owning the last start timestamp and the
//!   cached resource snapshot, reconciling resources against the window
//! - The ticker that drives reconciliation passes

mod manager;
mod ticker;
mod window;

pub use manager::*;
pub use ticker::*;
pub use window::*;

use thiserror::Error;

/// Core errors
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Scheduler manager has stopped")]
    ManagerStopped,
}

pub type CoreResult<T> = Result<T, CoreError>;
