//! In-memory collaborator doubles.
//!
//! [`FakeBackend`] implements every collaborator trait from plain fields,
//! counts calls per collaborator, and can be told to fail any of them.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use ctx_alerts::{Incident, IncidentOccurrenceTracker, Urgency};
use ctx_audit::AuditEvent;

use crate::error::{Collaborator, SourceError};
use crate::snapshot::{
    BanStatus, ClusterIdentity, Environment, HealthDetails, Issue, ServiceLogEntry, SupportStatus,
    Topology,
};
use crate::sources::{
    AlertFetcher, AuditTrailFetcher, ClusterFetcher, EnvironmentHealthFetcher, JiraIssueFetcher,
    ServiceLogFetcher, SourceResult,
};

const COLLABORATORS: [Collaborator; 6] = [
    Collaborator::Inventory,
    Collaborator::IssueTracker,
    Collaborator::EnvironmentHealth,
    Collaborator::ServiceLogs,
    Collaborator::Alerting,
    Collaborator::AuditTrail,
];

fn slot(collaborator: Collaborator) -> usize {
    COLLABORATORS
        .iter()
        .position(|c| *c == collaborator)
        .unwrap_or_default()
}

/// Collaborator double backed by plain data.
#[derive(Debug, Default)]
pub struct FakeBackend {
    /// Environment reported by the inventory.
    pub environment: Environment,
    /// The only cluster the inventory knows; `None` means every lookup misses.
    pub cluster: Option<ClusterIdentity>,
    /// Support state returned for the cluster.
    pub support: SupportStatus,
    /// Cluster tickets.
    pub issues: Vec<Issue>,
    /// Organization support exceptions.
    pub exceptions: Vec<Issue>,
    /// Health links.
    pub health: Option<HealthDetails>,
    /// Service logs, returned unfiltered.
    pub service_logs: Vec<ServiceLogEntry>,
    /// Alerting services discovered for the cluster.
    pub service_ids: Vec<String>,
    /// Open incidents per service.
    pub current: BTreeMap<String, Vec<Incident>>,
    /// Incident history per service.
    pub historical: BTreeMap<String, Vec<IncidentOccurrenceTracker>>,
    /// Raw audit events.
    pub audit_events: Vec<AuditEvent>,
    failures: HashMap<Collaborator, String>,
    calls: [AtomicUsize; 6],
    exception_calls: AtomicUsize,
}

impl FakeBackend {
    /// A production standalone cluster with data in every section.
    #[must_use]
    pub fn populated() -> Self {
        let now = Utc::now();
        let service_id = "PD12345".to_string();

        let mut current = BTreeMap::new();
        current.insert(
            service_id.clone(),
            vec![
                Incident::new("Q1", "ClusterOperatorDown", Urgency::High),
                Incident::new("Q2", "KubePersistentVolumeFillingUp", Urgency::Low),
            ],
        );
        let mut historical = BTreeMap::new();
        historical.insert(
            service_id.clone(),
            vec![
                IncidentOccurrenceTracker::new("ClusterOperatorDown", 3, "2024-01-02"),
                IncidentOccurrenceTracker::new("api-ErrorBudgetBurn", 2, "2024-01-01"),
            ],
        );

        Self {
            environment: Environment::Production,
            cluster: Some(ClusterIdentity {
                id: "mock-cluster-id".into(),
                external_id: "mock-external-id".into(),
                infra_id: "mock-infra-id".into(),
                name: "mock-cluster".into(),
                created_at: Some(now - TimeDelta::days(90)),
                topology: Topology::Standalone,
                version: "4.15.3".into(),
                description: "ready".into(),
                base_domain: Some("mock.example.com".into()),
                subscription_id: Some("mock-subscription-id".into()),
                organization_id: Some("mock-org-id".into()),
            }),
            support: SupportStatus {
                limited_support_reasons: Vec::new(),
                ban: BanStatus::default(),
            },
            issues: vec![Issue {
                key: "OHSS-1000".into(),
                summary: "Cluster upgrade stuck".into(),
                issue_type: "Story".into(),
                priority: "Major".into(),
                status: "New".into(),
                url: "https://issues.redhat.com/browse/OHSS-1000".into(),
            }],
            exceptions: vec![Issue {
                key: "OSDEE-200".into(),
                summary: "Custom ingress controller".into(),
                issue_type: "Story".into(),
                priority: "Normal".into(),
                status: "Approved".into(),
                url: "https://issues.redhat.com/browse/OSDEE-200".into(),
            }],
            health: Some(HealthDetails {
                tenant_url: "https://health.example.com/tenants/mock".into(),
                logs_url: "https://health.example.com/logs/mock".into(),
            }),
            service_logs: vec![ServiceLogEntry::new(
                now - TimeDelta::days(2),
                "Cluster upgraded to 4.15.3",
            )],
            service_ids: vec![service_id],
            current,
            historical,
            audit_events: vec![
                AuditEvent::new("e1", "CreateInstance", Some("customer-admin"), now),
                AuditEvent::new("e2", "GetObject", Some("customer-admin"), now),
                AuditEvent::new("e3", "DeleteBucket", Some("customer-admin"), now),
                AuditEvent::new("e4", "PutRolePolicy", Some("RH-SRE-jdoe"), now),
            ],
            ..Self::default()
        }
    }

    /// A populated backend whose cluster runs a hosted control plane.
    #[must_use]
    pub fn hosted() -> Self {
        let mut backend = Self::populated();
        if let Some(cluster) = backend.cluster.as_mut() {
            cluster.topology = Topology::HostedControlPlane;
        }
        backend
    }

    /// Makes every call to `collaborator` fail with `reason`.
    pub fn fail(&mut self, collaborator: Collaborator, reason: impl Into<String>) {
        self.failures.insert(collaborator, reason.into());
    }

    /// Calls made to `collaborator` so far.
    #[must_use]
    pub fn calls_to(&self, collaborator: Collaborator) -> usize {
        self.calls[slot(collaborator)].load(Ordering::SeqCst)
    }

    /// Calls made to any collaborator so far.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    /// Support-exception lookups made so far.
    #[must_use]
    pub fn exception_calls(&self) -> usize {
        self.exception_calls.load(Ordering::SeqCst)
    }

    fn enter(&self, collaborator: Collaborator) -> SourceResult<()> {
        self.calls[slot(collaborator)].fetch_add(1, Ordering::SeqCst);
        match self.failures.get(&collaborator) {
            Some(reason) => Err(SourceError::unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterFetcher for FakeBackend {
    fn environment(&self) -> Environment {
        self.environment.clone()
    }

    async fn get_cluster(&self, key: &str) -> SourceResult<ClusterIdentity> {
        self.enter(Collaborator::Inventory)?;
        self.cluster
            .iter()
            .find(|c| c.id == key || c.external_id == key || c.name == key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(key.to_string()))
    }

    async fn support_status(&self, _cluster: &ClusterIdentity) -> SourceResult<SupportStatus> {
        self.enter(Collaborator::Inventory)?;
        Ok(self.support.clone())
    }
}

#[async_trait]
impl JiraIssueFetcher for FakeBackend {
    async fn issues_for_cluster(
        &self,
        _cluster_id: &str,
        _external_id: &str,
    ) -> SourceResult<Vec<Issue>> {
        self.enter(Collaborator::IssueTracker)?;
        Ok(self.issues.clone())
    }

    async fn support_exceptions_for_org(&self, _organization_id: &str) -> SourceResult<Vec<Issue>> {
        self.exception_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(Collaborator::IssueTracker)?;
        Ok(self.exceptions.clone())
    }
}

#[async_trait]
impl EnvironmentHealthFetcher for FakeBackend {
    async fn fetch_cluster_details(
        &self,
        _cluster: &ClusterIdentity,
    ) -> SourceResult<Option<HealthDetails>> {
        self.enter(Collaborator::EnvironmentHealth)?;
        Ok(self.health.clone())
    }
}

#[async_trait]
impl ServiceLogFetcher for FakeBackend {
    async fn logs_since(
        &self,
        _cluster_id: &str,
        _since: DateTime<Utc>,
        _all_messages: bool,
        _internal_only: bool,
    ) -> SourceResult<Vec<ServiceLogEntry>> {
        self.enter(Collaborator::ServiceLogs)?;
        Ok(self.service_logs.clone())
    }
}

#[async_trait]
impl AlertFetcher for FakeBackend {
    async fn service_ids(&self, _cluster: &ClusterIdentity) -> SourceResult<Vec<String>> {
        self.enter(Collaborator::Alerting)?;
        Ok(self.service_ids.clone())
    }

    async fn current_incidents(&self, service_id: &str) -> SourceResult<Vec<Incident>> {
        self.enter(Collaborator::Alerting)?;
        Ok(self.current.get(service_id).cloned().unwrap_or_default())
    }

    async fn historical_incidents(
        &self,
        service_id: &str,
        _since: DateTime<Utc>,
    ) -> SourceResult<Vec<IncidentOccurrenceTracker>> {
        self.enter(Collaborator::Alerting)?;
        Ok(self.historical.get(service_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AuditTrailFetcher for FakeBackend {
    async fn lookup_events(
        &self,
        _cluster: &ClusterIdentity,
        _page_limit: u32,
    ) -> SourceResult<Vec<AuditEvent>> {
        self.enter(Collaborator::AuditTrail)?;
        Ok(self.audit_events.clone())
    }
}
