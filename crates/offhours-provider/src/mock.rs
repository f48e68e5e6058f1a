//! In-memory backend for tests and simulation

use async_trait::async_trait;
use offhours_api::{Resource, ResourceDetails, ResourceKind, TagFilter};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{ProviderError, ProviderResult, ResourceBackend};

/// Action recorded by the mock backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendAction {
    StartInstance(String),
    StopInstance(String),
    StartCluster(String),
    StopCluster(String),
    SetDesiredCapacity { id: String, desired: u32 },
    StartDatabase(String),
    StopDatabase(String),
    SetDatabaseMultiAz { id: String, enabled: bool },
}

/// Inventory entry of the mock backend
#[derive(Debug, Clone)]
pub struct MockResource {
    pub id: String,
    pub name: Option<String>,
    /// Raw status; auto scaling groups derive theirs from size/max
    pub state: String,
    pub tags: HashMap<String, String>,
    pub details: ResourceDetails,
}

impl MockResource {
    pub fn new(id: impl Into<String>, state: impl Into<String>, details: ResourceDetails) -> Self {
        Self {
            id: id.into(),
            name: None,
            state: state.into(),
            tags: HashMap::new(),
            details,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    /// Render the snapshot a cloud listing would report
    pub fn snapshot(&self) -> Resource {
        let (state, is_available) = match &self.details {
            ResourceDetails::Instance => (self.state.clone(), self.state == "running"),
            ResourceDetails::Database { multi_az } => {
                let label = if *multi_az {
                    format!("{} (Multi-AZ)", self.state)
                } else {
                    self.state.clone()
                };
                (label, self.state == "available")
            }
            ResourceDetails::Cluster => (self.state.clone(), self.state == "available"),
            ResourceDetails::AutoScalingGroup { size, max } => {
                (format!("{}/{} instances", size, max), size == max)
            }
            ResourceDetails::Other { .. } => (self.state.clone(), false),
        };

        Resource::new(
            self.id.clone(),
            self.name.clone(),
            state,
            is_available,
            self.details.clone(),
        )
    }
}

/// Mock backend for unit/integration testing and the simulated daemon mode.
///
/// Actions take effect immediately and are recorded in order. Resources of
/// an unrecognized kind surface through the instance listing, the way a
/// describe call can return entries the scheduler does not manage.
#[derive(Clone, Default)]
pub struct MockBackend {
    resources: Arc<Mutex<Vec<MockResource>>>,
    actions: Arc<Mutex<Vec<BackendAction>>>,

    /// Configure listing to fail
    pub fail_list: Arc<Mutex<bool>>,

    /// Configure actions to fail
    pub fail_actions: Arc<Mutex<bool>>,

    /// Delay applied to every listing call
    pub list_delay: Arc<Mutex<Option<Duration>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(resources: impl IntoIterator<Item = MockResource>) -> Self {
        let backend = Self::new();
        for resource in resources {
            backend.insert(resource);
        }
        backend
    }

    /// Add or replace a resource
    pub fn insert(&self, resource: MockResource) {
        let mut resources = self.resources.lock().unwrap();
        resources.retain(|r| r.id != resource.id);
        resources.push(resource);
    }

    /// Simulate a state change made outside the scheduler
    pub fn set_state(&self, id: &str, state: impl Into<String>) {
        if let Some(r) = self.resources.lock().unwrap().iter_mut().find(|r| r.id == id) {
            r.state = state.into();
        }
    }

    /// Current inventory entry for `id`
    pub fn get(&self, id: &str) -> Option<MockResource> {
        self.resources
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Actions received so far
    pub fn actions(&self) -> Vec<BackendAction> {
        self.actions.lock().unwrap().clone()
    }

    pub fn clear_actions(&self) {
        self.actions.lock().unwrap().clear();
    }

    pub fn set_fail_list(&self, fail: bool) {
        *self.fail_list.lock().unwrap() = fail;
    }

    pub fn set_fail_actions(&self, fail: bool) {
        *self.fail_actions.lock().unwrap() = fail;
    }

    pub fn set_list_delay(&self, delay: Option<Duration>) {
        *self.list_delay.lock().unwrap() = delay;
    }

    async fn list(&self, tag: &TagFilter, kinds: &[ResourceKind]) -> ProviderResult<Vec<Resource>> {
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.fail_list.lock().unwrap() {
            return Err(ProviderError::RequestFailed("Mock list failure".into()));
        }

        Ok(self
            .resources
            .lock()
            .unwrap()
            .iter()
            .filter(|r| kinds.contains(&r.details.kind()) && tag.matches(&r.tags))
            .map(MockResource::snapshot)
            .collect())
    }

    fn apply(
        &self,
        action: BackendAction,
        id: &str,
        update: impl FnOnce(&mut MockResource),
    ) -> ProviderResult<()> {
        if *self.fail_actions.lock().unwrap() {
            return Err(ProviderError::RequestFailed("Mock action failure".into()));
        }

        let mut resources = self.resources.lock().unwrap();
        let resource = resources
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        update(resource);

        self.actions.lock().unwrap().push(action);
        Ok(())
    }
}

#[async_trait]
impl ResourceBackend for MockBackend {
    async fn list_instances(&self, tag: &TagFilter) -> ProviderResult<Vec<Resource>> {
        self.list(tag, &[ResourceKind::Instance, ResourceKind::Other]).await
    }

    async fn list_databases(&self, tag: &TagFilter) -> ProviderResult<Vec<Resource>> {
        self.list(tag, &[ResourceKind::Database]).await
    }

    async fn list_clusters(&self, tag: &TagFilter) -> ProviderResult<Vec<Resource>> {
        self.list(tag, &[ResourceKind::Cluster]).await
    }

    async fn list_auto_scaling_groups(&self, tag: &TagFilter) -> ProviderResult<Vec<Resource>> {
        self.list(tag, &[ResourceKind::AutoScalingGroup]).await
    }

    async fn start_instance(&self, id: &str) -> ProviderResult<()> {
        self.apply(BackendAction::StartInstance(id.into()), id, |r| {
            r.state = "running".into()
        })
    }

    async fn stop_instance(&self, id: &str) -> ProviderResult<()> {
        self.apply(BackendAction::StopInstance(id.into()), id, |r| {
            r.state = "stopped".into()
        })
    }

    async fn start_cluster(&self, id: &str) -> ProviderResult<()> {
        self.apply(BackendAction::StartCluster(id.into()), id, |r| {
            r.state = "available".into()
        })
    }

    async fn stop_cluster(&self, id: &str) -> ProviderResult<()> {
        self.apply(BackendAction::StopCluster(id.into()), id, |r| {
            r.state = "stopped".into()
        })
    }

    async fn set_desired_capacity(&self, id: &str, desired: u32) -> ProviderResult<()> {
        let action = BackendAction::SetDesiredCapacity {
            id: id.into(),
            desired,
        };
        self.apply(action, id, |r| {
            if let ResourceDetails::AutoScalingGroup { size, max } = &mut r.details {
                *size = desired.min(*max);
            }
        })
    }

    async fn start_database(&self, id: &str) -> ProviderResult<()> {
        self.apply(BackendAction::StartDatabase(id.into()), id, |r| {
            r.state = "available".into()
        })
    }

    async fn stop_database(&self, id: &str) -> ProviderResult<()> {
        self.apply(BackendAction::StopDatabase(id.into()), id, |r| {
            r.state = "stopped".into()
        })
    }

    async fn set_database_multi_az(&self, id: &str, enabled: bool) -> ProviderResult<()> {
        let action = BackendAction::SetDatabaseMultiAz {
            id: id.into(),
            enabled,
        };
        self.apply(action, id, |r| {
            if let ResourceDetails::Database { multi_az } = &mut r.details {
                *multi_az = enabled;
            }
        })
    }
}
