//! Shared utilities for offhoursd
//!
//! This crate provides:
//! - Wall-clock access with a debug-only mock time override
//! - Epoch-millisecond helpers
//! - Default paths for config and data directories

mod paths;
mod time;

pub use paths::*;
pub use time::*;
