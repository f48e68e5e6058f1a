//! Resource provider for offhoursd
//!
//! This crate separates the raw cloud seam from the contract the scheduler
//! core relies on:
//! - `ResourceBackend`: fallible per-kind discovery and actions, one
//!   implementation per cloud (plus `MockBackend` for tests and simulation)
//! - `ResourceProvider`: wraps a backend and the store, never fails into the
//!   caller, applies the Multi-AZ policy and a deadline to every call

mod backend;
mod mock;
mod provider;

pub use backend::*;
pub use mock::*;
pub use provider::*;

use offhours_store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Errors from backend and store operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
