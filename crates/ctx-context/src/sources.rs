//! Collaborator capabilities consumed by the assembler.
//!
//! Each external system is one trait. Backends implement them over their
//! own transport and own their connection and credentials; tests implement
//! them in memory (see the `testing` feature).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ctx_alerts::{Incident, IncidentOccurrenceTracker};
use ctx_audit::AuditEvent;

use crate::error::SourceError;
use crate::snapshot::{
    ClusterIdentity, Environment, HealthDetails, Issue, ServiceLogEntry, SupportStatus,
};

/// Result type returned by collaborators.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Cluster inventory.
#[async_trait]
pub trait ClusterFetcher: Send + Sync {
    /// Environment this inventory connection targets.
    fn environment(&self) -> Environment;

    /// Resolves a cluster by id, external id or name.
    ///
    /// Returns [`SourceError::NotFound`] when nothing matches.
    async fn get_cluster(&self, key: &str) -> SourceResult<ClusterIdentity>;

    /// Limited-support reasons and owner ban status.
    async fn support_status(&self, cluster: &ClusterIdentity) -> SourceResult<SupportStatus>;
}

/// Issue tracker.
#[async_trait]
pub trait JiraIssueFetcher: Send + Sync {
    /// Open tickets mentioning the cluster id or external id.
    async fn issues_for_cluster(&self, cluster_id: &str, external_id: &str)
    -> SourceResult<Vec<Issue>>;

    /// Support exceptions filed for the organization.
    async fn support_exceptions_for_org(&self, organization_id: &str) -> SourceResult<Vec<Issue>>;
}

/// Environment health API.
#[async_trait]
pub trait EnvironmentHealthFetcher: Send + Sync {
    /// Health system links for the cluster; `Ok(None)` when the cluster has none.
    async fn fetch_cluster_details(
        &self,
        cluster: &ClusterIdentity,
    ) -> SourceResult<Option<HealthDetails>>;
}

/// Service-log store.
#[async_trait]
pub trait ServiceLogFetcher: Send + Sync {
    /// Entries sent to the cluster since `since`.
    async fn logs_since(
        &self,
        cluster_id: &str,
        since: DateTime<Utc>,
        all_messages: bool,
        internal_only: bool,
    ) -> SourceResult<Vec<ServiceLogEntry>>;
}

/// Alerting service.
#[async_trait]
pub trait AlertFetcher: Send + Sync {
    /// Alerting services that page for the cluster, in report order.
    async fn service_ids(&self, cluster: &ClusterIdentity) -> SourceResult<Vec<String>>;

    /// Open incidents on one service.
    async fn current_incidents(&self, service_id: &str) -> SourceResult<Vec<Incident>>;

    /// Incident history of one service since `since`.
    async fn historical_incidents(
        &self,
        service_id: &str,
        since: DateTime<Utc>,
    ) -> SourceResult<Vec<IncidentOccurrenceTracker>>;
}

/// Cloud audit trail.
#[async_trait]
pub trait AuditTrailFetcher: Send + Sync {
    /// Raw events for the cluster's account, reading at most `page_limit` pages.
    async fn lookup_events(
        &self,
        cluster: &ClusterIdentity,
        page_limit: u32,
    ) -> SourceResult<Vec<AuditEvent>>;
}

/// The set of collaborators injected into a [`ContextAssembler`](crate::ContextAssembler).
#[derive(Clone)]
pub struct Collaborators {
    /// Cluster inventory.
    pub clusters: Arc<dyn ClusterFetcher>,
    /// Issue tracker.
    pub issues: Arc<dyn JiraIssueFetcher>,
    /// Environment health API.
    pub health: Arc<dyn EnvironmentHealthFetcher>,
    /// Service-log store.
    pub service_logs: Arc<dyn ServiceLogFetcher>,
    /// Alerting service.
    pub alerts: Arc<dyn AlertFetcher>,
    /// Audit trail.
    pub audit: Arc<dyn AuditTrailFetcher>,
}

impl Collaborators {
    /// Uses one value for every collaborator.
    pub fn shared<T>(backend: Arc<T>) -> Self
    where
        T: ClusterFetcher
            + JiraIssueFetcher
            + EnvironmentHealthFetcher
            + ServiceLogFetcher
            + AlertFetcher
            + AuditTrailFetcher
            + 'static,
    {
        Self {
            clusters: backend.clone(),
            issues: backend.clone(),
            health: backend.clone(),
            service_logs: backend.clone(),
            alerts: backend.clone(),
            audit: backend,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("environment", &self.clusters.environment())
            .finish_non_exhaustive()
    }
}
