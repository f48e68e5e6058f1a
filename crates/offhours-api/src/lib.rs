//! Wire types for offhoursd
//!
//! This crate defines the types shared between the scheduler core, the
//! resource provider and the HTTP surface:
//! - Resource snapshots, one variant per managed resource kind
//! - The read-only scheduler status returned to clients

mod types;

pub use types::*;

/// State label shown for every resource right after an extension request,
/// until the next reconciliation pass observes the real state.
pub const PENDING_STATE: &str = "pending";
