//! Store trait definitions

use crate::StoreResult;

/// Durable key/value store
pub trait Store: Send + Sync {
    /// Read the text value stored under `key`
    fn get_value(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write `value` under `key`, replacing any previous value
    fn set_value(&self, key: &str, value: &str) -> StoreResult<()>;
}
