//! Cloud backend trait

use async_trait::async_trait;
use offhours_api::{Resource, TagFilter};

use crate::ProviderResult;

/// Raw, fallible access to one cloud account.
///
/// Listing returns snapshots of the resources carrying the discovery tag.
/// A database snapshot reports `is_available` from its own status only; the
/// provider layers the Multi-AZ requirement on top.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    async fn list_instances(&self, tag: &TagFilter) -> ProviderResult<Vec<Resource>>;

    async fn list_databases(&self, tag: &TagFilter) -> ProviderResult<Vec<Resource>>;

    async fn list_clusters(&self, tag: &TagFilter) -> ProviderResult<Vec<Resource>>;

    async fn list_auto_scaling_groups(&self, tag: &TagFilter) -> ProviderResult<Vec<Resource>>;

    async fn start_instance(&self, id: &str) -> ProviderResult<()>;

    async fn stop_instance(&self, id: &str) -> ProviderResult<()>;

    async fn start_cluster(&self, id: &str) -> ProviderResult<()>;

    async fn stop_cluster(&self, id: &str) -> ProviderResult<()>;

    /// Set the desired instance count of an auto scaling group
    async fn set_desired_capacity(&self, id: &str, desired: u32) -> ProviderResult<()>;

    async fn start_database(&self, id: &str) -> ProviderResult<()>;

    async fn stop_database(&self, id: &str) -> ProviderResult<()>;

    /// Enable or disable Multi-AZ, applied immediately
    async fn set_database_multi_az(&self, id: &str, enabled: bool) -> ProviderResult<()>;
}
