//! Fail-soft resource provider used by the scheduler core

use chrono::{DateTime, Utc};
use offhours_api::{Resource, ResourceDetails, TagFilter};
use offhours_store::Store;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::{ProviderError, ProviderResult, ResourceBackend};

/// Default deadline for a single backend call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Status prefix of a provider state label, without suffixes such as " (Multi-AZ)"
fn base_state(state: &str) -> &str {
    state.split(" (").next().unwrap_or(state)
}

/// Resource discovery, start/stop actions and persistence of the last
/// uptime window start.
///
/// Nothing here returns an error: failures are logged and the caller sees an
/// empty listing, a skipped action or a zero timestamp. The next
/// reconciliation pass retries.
pub struct ResourceProvider {
    backend: Arc<dyn ResourceBackend>,
    store: Arc<dyn Store>,
    tag: TagFilter,
    last_started_key: String,
    use_multi_az: bool,
    call_timeout: Duration,
}

impl ResourceProvider {
    pub fn new(
        backend: Arc<dyn ResourceBackend>,
        store: Arc<dyn Store>,
        tag: TagFilter,
        last_started_key: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            store,
            tag,
            last_started_key: last_started_key.into(),
            use_multi_az: false,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Require databases to run Multi-AZ while the window is open
    pub fn with_multi_az(mut self, use_multi_az: bool) -> Self {
        self.use_multi_az = use_multi_az;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = ProviderResult<T>>,
    ) -> ProviderResult<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                operation,
                timeout: self.call_timeout,
            }),
        }
    }

    async fn listing(
        &self,
        what: &'static str,
        fut: impl Future<Output = ProviderResult<Vec<Resource>>>,
    ) -> Vec<Resource> {
        match self.call(what, fut).await {
            Ok(resources) => resources,
            Err(e) => {
                error!(error = %e, "Unable to load {}", what);
                Vec::new()
            }
        }
    }

    pub async fn list_instances(&self) -> Vec<Resource> {
        self.listing("instances", self.backend.list_instances(&self.tag))
            .await
    }

    /// Databases, with availability narrowed by the Multi-AZ requirement
    pub async fn list_databases(&self) -> Vec<Resource> {
        self.listing("databases", self.backend.list_databases(&self.tag))
            .await
            .into_iter()
            .map(|r| {
                let multi_az = matches!(r.details, ResourceDetails::Database { multi_az: true });
                Resource {
                    is_available: r.is_available && (!self.use_multi_az || multi_az),
                    ..r
                }
            })
            .collect()
    }

    pub async fn list_clusters(&self) -> Vec<Resource> {
        self.listing("clusters", self.backend.list_clusters(&self.tag))
            .await
    }

    pub async fn list_auto_scaling_groups(&self) -> Vec<Resource> {
        self.listing(
            "auto scaling groups",
            self.backend.list_auto_scaling_groups(&self.tag),
        )
        .await
    }

    /// All four kinds, queried one after another
    pub async fn list_all(&self) -> Vec<Resource> {
        let mut resources = self.list_instances().await;
        resources.extend(self.list_databases().await);
        resources.extend(self.list_clusters().await);
        resources.extend(self.list_auto_scaling_groups().await);
        resources
    }

    async fn act(
        &self,
        verb: &'static str,
        r: &Resource,
        fut: impl Future<Output = ProviderResult<()>>,
    ) {
        match self.call(verb, fut).await {
            Ok(()) => info!(resource = %r.name, id = %r.id, kind = %r.kind(), "{}", verb),
            Err(e) => error!(
                resource = %r.name,
                id = %r.id,
                kind = %r.kind(),
                error = %e,
                "Unable to {}",
                verb.to_lowercase()
            ),
        }
    }

    pub async fn start_instance(&self, r: &Resource) {
        self.act("Starting instance", r, self.backend.start_instance(&r.id))
            .await
    }

    pub async fn stop_instance(&self, r: &Resource) {
        self.act("Stopping instance", r, self.backend.stop_instance(&r.id))
            .await
    }

    pub async fn start_cluster(&self, r: &Resource) {
        self.act("Starting cluster", r, self.backend.start_cluster(&r.id))
            .await
    }

    pub async fn stop_cluster(&self, r: &Resource) {
        self.act("Stopping cluster", r, self.backend.stop_cluster(&r.id))
            .await
    }

    /// Scale the group up to its maximum
    pub async fn start_auto_scaling_group(&self, r: &Resource) {
        let max = match r.details {
            ResourceDetails::AutoScalingGroup { max, .. } => max,
            _ => {
                warn!(resource = %r.name, kind = %r.kind(), "Not an auto scaling group");
                return;
            }
        };
        self.act(
            "Starting auto scaling group",
            r,
            self.backend.set_desired_capacity(&r.id, max),
        )
        .await
    }

    /// Scale the group down to zero
    pub async fn stop_auto_scaling_group(&self, r: &Resource) {
        self.act(
            "Stopping auto scaling group",
            r,
            self.backend.set_desired_capacity(&r.id, 0),
        )
        .await
    }

    /// Start a stopped database, or enable Multi-AZ on a running one when it
    /// is required and missing. At most one backend action per call.
    ///
    /// The Multi-AZ check looks at the reported status: `is_available` is
    /// already false for single-AZ databases when Multi-AZ is required.
    pub async fn start_database(&self, r: &Resource) {
        let multi_az = matches!(r.details, ResourceDetails::Database { multi_az: true });
        let state = base_state(&r.state);

        if state == "stopped" {
            self.act("Starting database", r, self.backend.start_database(&r.id))
                .await
        } else if state == "available" && self.use_multi_az && !multi_az {
            self.act(
                "Enabling Multi-AZ for database",
                r,
                self.backend.set_database_multi_az(&r.id, true),
            )
            .await
        }
    }

    /// Disable Multi-AZ first if enabled, otherwise stop. The stop itself
    /// happens on a later pass once Multi-AZ is off.
    pub async fn stop_database(&self, r: &Resource) {
        let multi_az = matches!(r.details, ResourceDetails::Database { multi_az: true });

        if r.is_available && multi_az {
            self.act(
                "Disabling Multi-AZ for database",
                r,
                self.backend.set_database_multi_az(&r.id, false),
            )
            .await
        } else if r.is_available {
            self.act("Stopping database", r, self.backend.stop_database(&r.id))
                .await
        }
    }

    /// Stored values must parse as epoch milliseconds chrono can represent
    fn read_last_started(&self) -> ProviderResult<i64> {
        let Some(text) = self.store.get_value(&self.last_started_key)? else {
            return Ok(0);
        };

        match text.trim().parse::<i64>() {
            Ok(millis) if DateTime::<Utc>::from_timestamp_millis(millis).is_some() => Ok(millis),
            _ => Err(ProviderError::InvalidValue(text)),
        }
    }

    /// Start of the current uptime window in epoch milliseconds, 0 when
    /// unknown or unreadable.
    pub async fn get_last_started(&self) -> i64 {
        match self.read_last_started() {
            Ok(value) => value,
            Err(e) => {
                error!(key = %self.last_started_key, error = %e, "Unable to get lastStarted");
                0
            }
        }
    }

    pub async fn set_last_started(&self, value: i64) {
        if let Err(e) = self
            .store
            .set_value(&self.last_started_key, &value.to_string())
        {
            error!(
                key = %self.last_started_key,
                value,
                error = %e,
                "Unable to set lastStarted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendAction, MockBackend, MockResource};
    use offhours_store::SqliteStore;

    const KEY: &str = "/scheduler/lastStarted";

    fn provider_with(backend: &MockBackend, use_multi_az: bool) -> (ResourceProvider, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let provider = ResourceProvider::new(
            Arc::new(backend.clone()),
            store.clone(),
            TagFilter::new("scheduler-enabled", "true"),
            KEY,
        )
        .with_multi_az(use_multi_az);
        (provider, store)
    }

    fn database(id: &str, state: &str, multi_az: bool) -> MockResource {
        MockResource::new(id, state, ResourceDetails::Database { multi_az })
            .with_tag("scheduler-enabled", "true")
    }

    #[test]
    fn base_state_strips_suffix() {
        assert_eq!(base_state("stopped"), "stopped");
        assert_eq!(base_state("available (Multi-AZ)"), "available");
    }

    #[tokio::test]
    async fn multi_az_requirement_narrows_availability() {
        let backend = MockBackend::with_resources([
            database("single", "available", false),
            database("multi", "available", true),
        ]);

        let (relaxed, _) = provider_with(&backend, false);
        assert!(relaxed.list_databases().await.iter().all(|r| r.is_available));

        let (strict, _) = provider_with(&backend, true);
        let dbs = strict.list_databases().await;
        let single = dbs.iter().find(|r| r.id == "single").unwrap();
        let multi = dbs.iter().find(|r| r.id == "multi").unwrap();
        assert!(!single.is_available);
        assert!(multi.is_available);
    }

    #[tokio::test]
    async fn start_database_enables_multi_az_instead_of_starting() {
        let backend = MockBackend::with_resources([database("db", "available", false)]);
        let (provider, _) = provider_with(&backend, true);

        let listed = provider.list_databases().await.remove(0);
        assert!(!listed.is_available);
        provider.start_database(&listed).await;

        assert_eq!(
            backend.actions(),
            vec![BackendAction::SetDatabaseMultiAz { id: "db".into(), enabled: true }]
        );
    }

    #[tokio::test]
    async fn start_database_starts_stopped() {
        let backend = MockBackend::with_resources([database("db", "stopped", false)]);
        let (provider, _) = provider_with(&backend, true);

        let snapshot = backend.get("db").unwrap().snapshot();
        provider.start_database(&snapshot).await;

        assert_eq!(backend.actions(), vec![BackendAction::StartDatabase("db".into())]);
    }

    #[tokio::test]
    async fn stop_database_disables_multi_az_first() {
        let backend = MockBackend::with_resources([database("db", "available", true)]);
        let (provider, _) = provider_with(&backend, false);

        let first = provider.list_databases().await.remove(0);
        provider.stop_database(&first).await;
        assert_eq!(
            backend.actions(),
            vec![BackendAction::SetDatabaseMultiAz { id: "db".into(), enabled: false }]
        );

        backend.clear_actions();
        let second = provider.list_databases().await.remove(0);
        provider.stop_database(&second).await;
        assert_eq!(backend.actions(), vec![BackendAction::StopDatabase("db".into())]);
    }

    #[tokio::test]
    async fn auto_scaling_group_uses_max_and_zero() {
        let backend = MockBackend::with_resources([MockResource::new(
            "g",
            "",
            ResourceDetails::AutoScalingGroup { size: 1, max: 4 },
        )
        .with_tag("scheduler-enabled", "true")]);
        let (provider, _) = provider_with(&backend, false);

        let group = provider.list_auto_scaling_groups().await.remove(0);
        provider.start_auto_scaling_group(&group).await;
        provider.stop_auto_scaling_group(&group).await;

        assert_eq!(
            backend.actions(),
            vec![
                BackendAction::SetDesiredCapacity { id: "g".into(), desired: 4 },
                BackendAction::SetDesiredCapacity { id: "g".into(), desired: 0 },
            ]
        );
    }

    #[tokio::test]
    async fn listing_fails_soft() {
        let backend = MockBackend::with_resources([MockResource::new(
            "i-1",
            "running",
            ResourceDetails::Instance,
        )
        .with_tag("scheduler-enabled", "true")]);
        let (provider, _) = provider_with(&backend, false);

        assert_eq!(provider.list_all().await.len(), 1);

        backend.set_fail_list(true);
        assert!(provider.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn actions_fail_soft() {
        let backend = MockBackend::with_resources([MockResource::new(
            "i-1",
            "stopped",
            ResourceDetails::Instance,
        )]);
        let (provider, _) = provider_with(&backend, false);
        backend.set_fail_actions(true);

        let snapshot = backend.get("i-1").unwrap().snapshot();
        provider.start_instance(&snapshot).await;

        assert!(backend.actions().is_empty());
        assert_eq!(backend.get("i-1").unwrap().state, "stopped");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_listing_hits_deadline() {
        let backend = MockBackend::with_resources([MockResource::new(
            "i-1",
            "running",
            ResourceDetails::Instance,
        )
        .with_tag("scheduler-enabled", "true")]);
        backend.set_list_delay(Some(Duration::from_secs(60)));

        let (provider, _) = provider_with(&backend, false);
        let provider = provider.with_call_timeout(Duration::from_secs(5));

        assert!(provider.list_instances().await.is_empty());
    }

    #[tokio::test]
    async fn last_started_round_trip() {
        let backend = MockBackend::new();
        let (provider, store) = provider_with(&backend, false);

        assert_eq!(provider.get_last_started().await, 0);

        provider.set_last_started(1_573_261_444_114).await;
        assert_eq!(provider.get_last_started().await, 1_573_261_444_114);
        assert_eq!(store.get_value(KEY).unwrap().as_deref(), Some("1573261444114"));
    }

    #[tokio::test]
    async fn malformed_last_started_reads_as_zero() {
        let backend = MockBackend::new();
        let (provider, store) = provider_with(&backend, false);

        store.set_value(KEY, "yesterday").unwrap();
        assert_eq!(provider.get_last_started().await, 0);
    }

    #[tokio::test]
    async fn out_of_range_last_started_reads_as_zero() {
        let backend = MockBackend::new();
        let (provider, store) = provider_with(&backend, false);

        for value in [i64::MAX, i64::MIN] {
            store.set_value(KEY, &value.to_string()).unwrap();
            assert_eq!(provider.get_last_started().await, 0, "{}", value);
        }

        store.set_value(KEY, "-1000").unwrap();
        assert_eq!(provider.get_last_started().await, -1000);
    }
}
