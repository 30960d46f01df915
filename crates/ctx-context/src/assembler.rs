//! Context assembly.
//!
//! Identity resolution runs first and is the only fatal call. Everything
//! else runs concurrently afterwards, and each result lands in its own
//! snapshot field. A failed section is left empty and recorded in
//! [`ContextSnapshot::unavailable`].

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use ctx_alerts::{HistorySummary, Incident, IncidentOccurrenceTracker};
use ctx_audit::{AuditEvent, EventClassifier};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::{Collaborator, ContextError, Result, SourceError};
use crate::links::LinkBuilder;
use crate::snapshot::{
    ClusterIdentity, ContextSnapshot, HealthDetails, Issue, Section, ServiceLogEntry,
    SupportStatus, UnavailableSection,
};
use crate::sources::{Collaborators, SourceResult};

/// Default lookback window in days.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Default audit trail page limit.
pub const DEFAULT_AUDIT_PAGE_LIMIT: u32 = 40;

/// How non-fatal collaborator failures are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssemblyPolicy {
    /// Leave the failed section empty and keep going.
    #[default]
    BestEffort,
    /// Return the first collaborator failure as an error.
    Strict,
}

/// What to assemble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRequest {
    /// Cluster id, external id or name.
    pub cluster_key: String,
    /// Lookback window for service logs and alert history.
    pub lookback_days: u32,
    /// Maximum audit trail pages to read.
    pub audit_page_limit: u32,
    /// Whether to read the audit trail at all.
    pub include_audit_trail: bool,
    /// Organization for support exceptions; defaults to the cluster's.
    pub organization_id: Option<String>,
    /// Alerting services to query; empty means ask the alerting collaborator.
    pub alert_service_ids: Vec<String>,
    /// Include every service-log message, not only operator-facing ones.
    pub all_messages: bool,
    /// Only internal service-log messages.
    pub internal_only: bool,
    /// Failure handling.
    pub policy: AssemblyPolicy,
}

impl ContextRequest {
    /// Creates a request with default window and page limit.
    #[must_use]
    pub fn new(cluster_key: impl Into<String>) -> Self {
        Self {
            cluster_key: cluster_key.into(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            audit_page_limit: DEFAULT_AUDIT_PAGE_LIMIT,
            include_audit_trail: false,
            organization_id: None,
            alert_service_ids: Vec::new(),
            all_messages: false,
            internal_only: false,
            policy: AssemblyPolicy::default(),
        }
    }

    /// Sets the lookback window.
    #[must_use]
    pub fn lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    /// Enables the audit trail with the given page limit.
    #[must_use]
    pub fn audit_trail(mut self, page_limit: u32) -> Self {
        self.include_audit_trail = true;
        self.audit_page_limit = page_limit;
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn policy(mut self, policy: AssemblyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Pins the alerting services to query.
    #[must_use]
    pub fn alert_service_ids(mut self, ids: Vec<String>) -> Self {
        self.alert_service_ids = ids;
        self
    }

    /// Start of the lookback window relative to `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if self.lookback_days == 0 {
            return Err(ContextError::invalid_configuration(
                "lookback window must be at least one day",
            ));
        }
        TimeDelta::try_days(i64::from(self.lookback_days))
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                ContextError::invalid_configuration(format!(
                    "lookback window of {} days is out of range",
                    self.lookback_days
                ))
            })
    }

    fn validate(&self) -> Result<()> {
        if self.cluster_key.trim().is_empty() {
            return Err(ContextError::invalid_configuration("cluster key is empty"));
        }
        if self.include_audit_trail && self.audit_page_limit == 0 {
            return Err(ContextError::invalid_configuration(
                "audit page limit must be at least one",
            ));
        }
        Ok(())
    }
}

/// Collected non-fatal failures.
#[derive(Debug, Default)]
struct Degradations {
    failures: Vec<(Section, ContextError)>,
    skipped: Vec<UnavailableSection>,
}

impl Degradations {
    fn record<T: Default>(
        &mut self,
        section: Section,
        collaborator: Collaborator,
        result: SourceResult<T>,
    ) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                self.failures.push((section, err.attribute(collaborator)));
                T::default()
            }
        }
    }

    fn skip(&mut self, section: Section, collaborator: Collaborator, reason: impl Into<String>) {
        self.skipped.push(UnavailableSection {
            section,
            collaborator,
            reason: reason.into(),
        });
    }

    fn into_sections(self, policy: AssemblyPolicy) -> Result<Vec<UnavailableSection>> {
        if policy == AssemblyPolicy::Strict {
            if let Some((_, err)) = self.failures.into_iter().next() {
                return Err(err);
            }
            return Ok(self.skipped);
        }

        let mut sections: Vec<UnavailableSection> = self
            .failures
            .into_iter()
            .map(|(section, err)| {
                let collaborator = err.collaborator().unwrap_or(Collaborator::Inventory);
                let reason = match err {
                    ContextError::CollaboratorUnavailable { reason, .. } => reason,
                    other => other.to_string(),
                };
                warn!(%section, %collaborator, %reason, "section unavailable");
                UnavailableSection {
                    section,
                    collaborator,
                    reason,
                }
            })
            .collect();
        sections.extend(self.skipped);
        Ok(sections)
    }
}

#[derive(Debug, Default)]
struct AlertData {
    service_ids: Vec<String>,
    current: BTreeMap<String, Vec<Incident>>,
    historical: BTreeMap<String, Vec<IncidentOccurrenceTracker>>,
}

/// Builds [`ContextSnapshot`]s from injected collaborators.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    collaborators: Collaborators,
    links: LinkBuilder,
    classifier: EventClassifier,
}

impl ContextAssembler {
    /// Creates an assembler with default links and classifier.
    #[must_use]
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            links: LinkBuilder::default(),
            classifier: EventClassifier::default(),
        }
    }

    /// Replaces the link builder.
    #[must_use]
    pub fn with_link_builder(mut self, links: LinkBuilder) -> Self {
        self.links = links;
        self
    }

    /// Replaces the audit event classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: EventClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// The link builder in use.
    #[must_use]
    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Assembles the snapshot for `request`.
    ///
    /// # Errors
    ///
    /// - [`ContextError::InvalidConfiguration`] before any collaborator call
    /// - [`ContextError::ClusterNotFound`] or an inventory failure when the
    ///   cluster cannot be resolved
    /// - the first collaborator failure under [`AssemblyPolicy::Strict`]
    pub async fn assemble(&self, request: &ContextRequest) -> Result<ContextSnapshot> {
        request.validate()?;
        let since = request.window_start(Utc::now())?;

        let cluster = self
            .collaborators
            .clusters
            .get_cluster(&request.cluster_key)
            .await
            .map_err(|err| match err {
                SourceError::NotFound(_) => ContextError::ClusterNotFound {
                    key: request.cluster_key.clone(),
                },
                other => other.attribute(Collaborator::Inventory),
            })?;
        let environment = self.collaborators.clusters.environment();
        debug!(
            cluster_id = %cluster.id,
            name = %cluster.name,
            %environment,
            hosted = cluster.topology.is_hosted(),
            "resolved cluster"
        );

        let mut degradations = Degradations::default();
        let organization_id = request
            .organization_id
            .clone()
            .or_else(|| cluster.organization_id.clone());

        let (support, issues, exceptions, health, logs, alerts, audit) = futures::join!(
            self.fetch_support(&cluster),
            self.fetch_issues(&cluster),
            self.fetch_exceptions(organization_id.as_deref()),
            self.fetch_health(&cluster),
            self.fetch_logs(&cluster, request, since),
            self.fetch_alerts(&cluster, request, since),
            self.fetch_audit(&cluster, request),
        );

        let support = degradations.record(Section::SupportStatus, Collaborator::Inventory, support);
        let jira_issues =
            degradations.record(Section::JiraIssues, Collaborator::IssueTracker, issues);
        let support_exceptions = match exceptions {
            Some(result) => {
                degradations.record(Section::SupportExceptions, Collaborator::IssueTracker, result)
            }
            None => {
                degradations.skip(
                    Section::SupportExceptions,
                    Collaborator::IssueTracker,
                    "no organization id known for cluster",
                );
                Vec::new()
            }
        };
        let environment_health = degradations.record(
            Section::EnvironmentHealth,
            Collaborator::EnvironmentHealth,
            health,
        );
        let mut service_logs: Vec<ServiceLogEntry> = degradations
            .record(Section::ServiceLogs, Collaborator::ServiceLogs, logs)
            .into_iter()
            .filter(|entry| entry.timestamp >= since)
            .collect();
        service_logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let alerts = collect_alerts(alerts, &mut degradations);
        let audit_events =
            degradations.record(Section::AuditTrail, Collaborator::AuditTrail, audit);

        let unavailable = degradations.into_sections(request.policy)?;

        let historical_incident_total =
            HistorySummary::build(&alerts.service_ids, &alerts.historical, request.lookback_days)
                .total;
        let links = self
            .links
            .build(&cluster, &environment, &alerts.service_ids);

        debug!(
            cluster_id = %cluster.id,
            service_logs = service_logs.len(),
            jira_issues = jira_issues.len(),
            audit_events = audit_events.len(),
            unavailable = unavailable.len(),
            "assembled context"
        );

        Ok(ContextSnapshot {
            cluster,
            environment,
            lookback_days: request.lookback_days,
            support,
            service_logs,
            jira_issues,
            support_exceptions,
            alert_service_ids: alerts.service_ids,
            current_alerts: alerts.current,
            historical_alerts: alerts.historical,
            historical_incident_total,
            audit_events,
            environment_health,
            links,
            unavailable,
        })
    }

    async fn fetch_support(&self, cluster: &ClusterIdentity) -> SourceResult<SupportStatus> {
        self.collaborators.clusters.support_status(cluster).await
    }

    async fn fetch_issues(&self, cluster: &ClusterIdentity) -> SourceResult<Vec<Issue>> {
        debug!(cluster_id = %cluster.id, "fetching cluster tickets");
        self.collaborators
            .issues
            .issues_for_cluster(&cluster.id, &cluster.external_id)
            .await
    }

    async fn fetch_exceptions(
        &self,
        organization_id: Option<&str>,
    ) -> Option<SourceResult<Vec<Issue>>> {
        let organization_id = organization_id?;
        debug!(%organization_id, "fetching support exceptions");
        Some(
            self.collaborators
                .issues
                .support_exceptions_for_org(organization_id)
                .await,
        )
    }

    async fn fetch_health(&self, cluster: &ClusterIdentity) -> SourceResult<Option<HealthDetails>> {
        self.collaborators.health.fetch_cluster_details(cluster).await
    }

    async fn fetch_logs(
        &self,
        cluster: &ClusterIdentity,
        request: &ContextRequest,
        since: DateTime<Utc>,
    ) -> SourceResult<Vec<ServiceLogEntry>> {
        debug!(cluster_id = %cluster.id, %since, "fetching service logs");
        self.collaborators
            .service_logs
            .logs_since(&cluster.id, since, request.all_messages, request.internal_only)
            .await
    }

    async fn fetch_audit(
        &self,
        cluster: &ClusterIdentity,
        request: &ContextRequest,
    ) -> SourceResult<Vec<AuditEvent>> {
        if !request.include_audit_trail {
            return Ok(Vec::new());
        }
        debug!(cluster_id = %cluster.id, pages = request.audit_page_limit, "fetching audit trail");
        let events = self
            .collaborators
            .audit
            .lookup_events(cluster, request.audit_page_limit)
            .await?;
        Ok(self.classifier.classify(events))
    }

    async fn fetch_alerts(
        &self,
        cluster: &ClusterIdentity,
        request: &ContextRequest,
        since: DateTime<Utc>,
    ) -> AlertFetch {
        let service_ids = if request.alert_service_ids.is_empty() {
            match self.collaborators.alerts.service_ids(cluster).await {
                Ok(ids) => ids,
                Err(err) => {
                    return AlertFetch {
                        discovery: Err(err),
                        per_service: Vec::new(),
                    };
                }
            }
        } else {
            request.alert_service_ids.clone()
        };

        let alerts = &self.collaborators.alerts;
        let per_service = join_all(service_ids.iter().map(|id| async move {
            let (current, historical) = futures::join!(
                alerts.current_incidents(id),
                alerts.historical_incidents(id, since),
            );
            (id.clone(), current, historical)
        }))
        .await;

        AlertFetch {
            discovery: Ok(service_ids),
            per_service,
        }
    }
}

fn collect_alerts(fetch: AlertFetch, degradations: &mut Degradations) -> AlertData {
    let service_ids =
        degradations.record(Section::AlertServices, Collaborator::Alerting, fetch.discovery);
    let mut data = AlertData {
        service_ids,
        ..AlertData::default()
    };

    let mut current_failed = false;
    let mut historical_failed = false;
    for (id, current, historical) in fetch.per_service {
        let current = match current {
            Ok(incidents) => incidents,
            Err(err) => {
                if !current_failed {
                    current_failed = true;
                    degradations.record::<()>(
                        Section::CurrentAlerts,
                        Collaborator::Alerting,
                        Err(with_service(err, &id)),
                    );
                }
                Vec::new()
            }
        };
        let historical = match historical {
            Ok(trackers) => trackers,
            Err(err) => {
                if !historical_failed {
                    historical_failed = true;
                    degradations.record::<()>(
                        Section::HistoricalAlerts,
                        Collaborator::Alerting,
                        Err(with_service(err, &id)),
                    );
                }
                Vec::new()
            }
        };
        data.current.insert(id.clone(), current);
        data.historical.insert(id, historical);
    }
    data
}

struct AlertFetch {
    discovery: SourceResult<Vec<String>>,
    per_service: Vec<(
        String,
        SourceResult<Vec<Incident>>,
        SourceResult<Vec<IncidentOccurrenceTracker>>,
    )>,
}

fn with_service(err: SourceError, service_id: &str) -> SourceError {
    match err {
        SourceError::NotFound(reason) => {
            SourceError::NotFound(format!("service {service_id}: {reason}"))
        }
        SourceError::Unavailable(reason) => {
            SourceError::Unavailable(format!("service {service_id}: {reason}"))
        }
        SourceError::Malformed(reason) => {
            SourceError::Malformed(format!("service {service_id}: {reason}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Environment, Topology};
    use crate::testing::FakeBackend;
    use ctx_alerts::Urgency;
    use std::sync::Arc;

    fn assembler(backend: FakeBackend) -> (ContextAssembler, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        (
            ContextAssembler::new(Collaborators::shared(backend.clone())),
            backend,
        )
    }

    #[tokio::test]
    async fn assembles_every_section() {
        let (assembler, _) = assembler(FakeBackend::populated());
        let request = ContextRequest::new("mock-cluster-id")
            .lookback_days(7)
            .audit_trail(2);

        let snapshot = assembler.assemble(&request).await.expect("assemble");

        assert_eq!(snapshot.cluster.id, "mock-cluster-id");
        assert_eq!(snapshot.environment, Environment::Production);
        assert_eq!(snapshot.lookback_days, 7);
        assert_eq!(snapshot.jira_issues.len(), 1);
        assert_eq!(snapshot.support_exceptions.len(), 1);
        assert_eq!(snapshot.service_logs.len(), 1);
        assert_eq!(snapshot.alert_service_ids, vec!["PD12345".to_string()]);
        assert_eq!(snapshot.historical_incident_total, 5);
        assert!(snapshot.environment_health.is_some());
        assert!(snapshot.links.audit_logs.is_some());
        assert!(snapshot.unavailable.is_empty(), "{:?}", snapshot.unavailable);
    }

    #[tokio::test]
    async fn audit_events_are_classified() {
        let (assembler, _) = assembler(FakeBackend::populated());
        let request = ContextRequest::new("mock-cluster-id").audit_trail(1);

        let snapshot = assembler.assemble(&request).await.expect("assemble");

        let names: Vec<&str> = snapshot.audit_events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["CreateInstance", "DeleteBucket", "PutRolePolicy"]);
        for event in &snapshot.audit_events {
            assert!(!event.actor_or_empty().starts_with("RH-SRE-"));
        }
        assert_eq!(snapshot.audit_events[2].actor, None);
    }

    #[tokio::test]
    async fn audit_trail_is_skipped_unless_requested() {
        let (assembler, backend) = assembler(FakeBackend::populated());
        let snapshot = assembler
            .assemble(&ContextRequest::new("mock-cluster-id"))
            .await
            .expect("assemble");

        assert!(snapshot.audit_events.is_empty());
        assert_eq!(backend.calls_to(Collaborator::AuditTrail), 0);
    }

    #[tokio::test]
    async fn unknown_cluster_is_fatal_and_stops_early() {
        let (assembler, backend) = assembler(FakeBackend::default());

        let err = assembler
            .assemble(&ContextRequest::new("missing"))
            .await
            .expect_err("should fail");

        assert_eq!(
            err,
            ContextError::ClusterNotFound {
                key: "missing".into()
            }
        );
        assert_eq!(backend.total_calls(), 1);
    }

    #[tokio::test]
    async fn inventory_outage_is_fatal() {
        let mut backend = FakeBackend::populated();
        backend.fail(Collaborator::Inventory, "503 Service Unavailable");
        let (assembler, _) = assembler(backend);

        let err = assembler
            .assemble(&ContextRequest::new("mock-cluster-id"))
            .await
            .expect_err("should fail");
        assert_eq!(err.collaborator(), Some(Collaborator::Inventory));
    }

    #[tokio::test]
    async fn ticketing_failure_degrades_gracefully() {
        let mut backend = FakeBackend::populated();
        backend.fail(Collaborator::IssueTracker, "401 Unauthorized");
        let (assembler, _) = assembler(backend);

        let snapshot = assembler
            .assemble(&ContextRequest::new("mock-cluster-id"))
            .await
            .expect("assembly still succeeds");

        assert!(snapshot.jira_issues.is_empty());
        assert!(snapshot.support_exceptions.is_empty());
        let gap = snapshot
            .unavailable(Section::JiraIssues)
            .expect("jira section recorded");
        assert_eq!(gap.collaborator, Collaborator::IssueTracker);
        assert_eq!(gap.reason, "401 Unauthorized");
        assert_eq!(snapshot.service_logs.len(), 1);
    }

    #[tokio::test]
    async fn strict_policy_surfaces_first_failure() {
        let mut backend = FakeBackend::populated();
        backend.fail(Collaborator::ServiceLogs, "timeout");
        let (assembler, _) = assembler(backend);

        let err = assembler
            .assemble(&ContextRequest::new("mock-cluster-id").policy(AssemblyPolicy::Strict))
            .await
            .expect_err("strict fails");
        assert_eq!(
            err,
            ContextError::CollaboratorUnavailable {
                collaborator: Collaborator::ServiceLogs,
                reason: "timeout".into()
            }
        );
    }

    #[tokio::test]
    async fn service_logs_outside_window_are_dropped() {
        let mut backend = FakeBackend::populated();
        backend.service_logs.push(ServiceLogEntry::new(
            Utc::now() - TimeDelta::days(40),
            "old news",
        ));
        let (assembler, _) = assembler(backend);

        let snapshot = assembler
            .assemble(&ContextRequest::new("mock-cluster-id").lookback_days(30))
            .await
            .expect("assemble");
        assert!(snapshot.service_logs.iter().all(|e| e.description != "old news"));
    }

    #[tokio::test]
    async fn alert_maps_cover_every_service() {
        let backend = FakeBackend::populated();
        let (assembler, _) = assembler(backend);
        let request = ContextRequest::new("mock-cluster-id")
            .alert_service_ids(vec!["PDQUIET".into(), "PD12345".into()]);

        let snapshot = assembler.assemble(&request).await.expect("assemble");

        assert_eq!(snapshot.alert_service_ids, vec!["PDQUIET", "PD12345"]);
        for id in &snapshot.alert_service_ids {
            assert!(snapshot.current_alerts.contains_key(id));
            assert!(snapshot.historical_alerts.contains_key(id));
        }
        assert!(snapshot.current_alerts_for("PDQUIET").is_empty());
        assert_eq!(snapshot.current_alerts_for("PD12345")[0].urgency, Urgency::High);
        assert_eq!(snapshot.links.alert_services.len(), 2);
    }

    #[tokio::test]
    async fn missing_organization_skips_exceptions() {
        let mut backend = FakeBackend::populated();
        if let Some(cluster) = backend.cluster.as_mut() {
            cluster.organization_id = None;
        }
        let (assembler, backend) = assembler(backend);

        let snapshot = assembler
            .assemble(&ContextRequest::new("mock-cluster-id").policy(AssemblyPolicy::Strict))
            .await
            .expect("skip is not a failure");

        assert!(snapshot.unavailable(Section::SupportExceptions).is_some());
        assert_eq!(backend.exception_calls(), 0);
    }

    #[tokio::test]
    async fn missing_health_details_leave_section_empty() {
        let mut backend = FakeBackend::populated();
        backend.health = None;
        let (assembler, _) = assembler(backend);

        let snapshot = assembler
            .assemble(&ContextRequest::new("mock-cluster-id"))
            .await
            .expect("assemble");
        assert!(snapshot.environment_health.is_none());
        assert!(snapshot.unavailable.is_empty());
    }

    #[tokio::test]
    async fn unknown_environment_omits_audit_link() {
        let mut backend = FakeBackend::populated();
        backend.environment = Environment::from_tag("integration");
        if let Some(cluster) = backend.cluster.as_mut() {
            cluster.topology = Topology::Standalone;
        }
        let (assembler, _) = assembler(backend);

        let snapshot = assembler
            .assemble(&ContextRequest::new("mock-cluster-id"))
            .await
            .expect("assemble");
        assert!(snapshot.links.audit_logs.is_none());
        assert!(!snapshot.links.ticket_search.is_empty());
    }

    #[tokio::test]
    async fn hosted_cluster_links_by_id_and_name() {
        let (assembler, _) = assembler(FakeBackend::hosted());

        let snapshot = assembler
            .assemble(&ContextRequest::new("mock-cluster-id"))
            .await
            .expect("assemble");
        assert!(snapshot.cluster.topology.is_hosted());
        let audit = snapshot.links.audit_logs.expect("production has an audit link");
        assert!(audit.contains("ocm-production-mock-cluster-id-mock-cluster"));
        assert!(!audit.contains("mock-infra-id"));
    }

    #[tokio::test]
    async fn standalone_cluster_links_by_infra_id() {
        let (assembler, _) = assembler(FakeBackend::populated());

        let snapshot = assembler
            .assemble(&ContextRequest::new("mock-cluster-id"))
            .await
            .expect("assemble");
        let audit = snapshot.links.audit_logs.expect("production has an audit link");
        assert!(audit.contains("mock-infra-id"));
    }

    #[tokio::test]
    async fn zero_day_window_is_rejected_before_any_call() {
        let (assembler, backend) = assembler(FakeBackend::populated());

        let err = assembler
            .assemble(&ContextRequest::new("mock-cluster-id").lookback_days(0))
            .await
            .expect_err("invalid");
        assert!(matches!(err, ContextError::InvalidConfiguration { .. }));
        assert_eq!(backend.total_calls(), 0);
    }
}
