//! Cluster context snapshot.
//!
//! A [`ContextSnapshot`] is built once per invocation by the
//! [`ContextAssembler`](crate::ContextAssembler) and only read afterwards.
//! Its serde form is the structured output contract: field names are stable
//! and collections always serialize (empty rather than missing).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use ctx_alerts::{Incident, IncidentOccurrenceTracker, UrgencyBreakdown};
use ctx_audit::AuditEvent;
use serde::{Deserialize, Serialize};

use crate::error::Collaborator;

/// How the cluster's control plane is deployed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Control plane runs on the cluster's own nodes.
    #[default]
    Standalone,
    /// Control plane is hosted on a management cluster.
    HostedControlPlane,
}

impl Topology {
    /// Maps the inventory's hosted-control-plane flag.
    #[must_use]
    pub const fn from_hosted_flag(hosted: bool) -> Self {
        if hosted {
            Self::HostedControlPlane
        } else {
            Self::Standalone
        }
    }

    /// True for [`Topology::HostedControlPlane`].
    #[must_use]
    pub const fn is_hosted(&self) -> bool {
        matches!(self, Self::HostedControlPlane)
    }

    /// Returns the topology as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::HostedControlPlane => "hosted_control_plane",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment environment the inventory connection targets.
///
/// Only `production` and `stage` are recognized; any other tag is carried
/// verbatim and treated as unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Environment {
    /// Production.
    Production,
    /// Staging.
    Stage,
    /// Anything else (integration, local, ...).
    Other(String),
}

impl Default for Environment {
    fn default() -> Self {
        Self::Other("unknown".to_string())
    }
}

impl Environment {
    /// Parses an environment tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "production" => Self::Production,
            "stage" => Self::Stage,
            other => Self::Other(other.to_string()),
        }
    }

    /// Derives the environment from the inventory API URL.
    ///
    /// `api.openshift.com` is production, `api.<env>.openshift.com` is
    /// `<env>`, and any other host is carried as the tag.
    #[must_use]
    pub fn from_api_url(api_url: &str) -> Self {
        let host = url::Url::parse(api_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        match host.as_str() {
            "api.openshift.com" => Self::Production,
            "" => Self::default(),
            _ => match host
                .strip_prefix("api.")
                .and_then(|rest| rest.strip_suffix(".openshift.com"))
            {
                Some(tag) if !tag.contains('.') => Self::from_tag(tag),
                _ => Self::Other(host),
            },
        }
    }

    /// Returns the environment tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Production => "production",
            Self::Stage => "stage",
            Self::Other(tag) => tag,
        }
    }

    /// True for `production` and `stage`.
    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        matches!(self, Self::Production | Self::Stage)
    }
}

impl From<String> for Environment {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.as_str().to_string()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved cluster identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterIdentity {
    /// Inventory cluster id.
    pub id: String,
    /// External (cluster-reported) id.
    pub external_id: String,
    /// Infrastructure id used to tag cloud resources.
    pub infra_id: String,
    /// Display name.
    pub name: String,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Standalone or hosted control plane.
    pub topology: Topology,
    /// Version string.
    pub version: String,
    /// Status description.
    pub description: String,
    /// DNS base domain.
    pub base_domain: Option<String>,
    /// Subscription id.
    pub subscription_id: Option<String>,
    /// Owning organization id.
    pub organization_id: Option<String>,
}

/// Why a cluster is in limited support.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitedSupportReason {
    /// One-line summary.
    pub summary: String,
    /// Full details.
    pub details: String,
}

/// Ban status of the cluster owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BanStatus {
    /// Whether the owner is banned.
    pub banned: bool,
    /// Ban code.
    pub code: String,
    /// Human-readable ban description.
    pub description: String,
}

/// Support state of the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportStatus {
    /// Limited-support reasons in inventory order.
    pub limited_support_reasons: Vec<LimitedSupportReason>,
    /// Owner ban status.
    pub ban: BanStatus,
}

/// A service-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLogEntry {
    /// When the entry was sent.
    pub timestamp: DateTime<Utc>,
    /// Body.
    pub description: String,
    /// Short summary.
    #[serde(default)]
    pub summary: String,
    /// Severity (`Info`, `Warning`, ...).
    #[serde(default)]
    pub severity: String,
}

impl ServiceLogEntry {
    /// Creates an entry with only timestamp and description.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, description: impl Into<String>) -> Self {
        Self {
            timestamp,
            description: description.into(),
            summary: String::new(),
            severity: String::new(),
        }
    }
}

/// An issue-tracker ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
    /// Ticket key (e.g. `OHSS-123`).
    pub key: String,
    /// Summary line.
    pub summary: String,
    /// Issue type name.
    pub issue_type: String,
    /// Priority name.
    pub priority: String,
    /// Status name.
    pub status: String,
    /// Browse URL.
    pub url: String,
}

/// Links into the environment health system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDetails {
    /// Tenant URL.
    pub tenant_url: String,
    /// Logs app URL.
    pub logs_url: String,
}

/// Web link to one alerting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLink {
    /// Alerting service id.
    pub service_id: String,
    /// Service directory URL.
    pub url: String,
}

/// Deep links built for the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticLinks {
    /// Audit-log search; `None` when the environment is not recognized.
    pub audit_logs: Option<String>,
    /// Issue-tracker search for tickets mentioning the cluster.
    pub ticket_search: String,
    /// Cluster dashboard.
    pub dashboard: String,
    /// One link per alerting service, in service order.
    pub alert_services: Vec<ServiceLink>,
}

/// Snapshot section that can be degraded independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Limited support and ban status.
    SupportStatus,
    /// Service logs.
    ServiceLogs,
    /// Cluster tickets.
    JiraIssues,
    /// Organization support exceptions.
    SupportExceptions,
    /// Environment health links.
    EnvironmentHealth,
    /// Alerting service discovery.
    AlertServices,
    /// Current incidents.
    CurrentAlerts,
    /// Historical incidents.
    HistoricalAlerts,
    /// Audit trail.
    AuditTrail,
}

impl Section {
    /// Returns the section name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SupportStatus => "support_status",
            Self::ServiceLogs => "service_logs",
            Self::JiraIssues => "jira_issues",
            Self::SupportExceptions => "support_exceptions",
            Self::EnvironmentHealth => "environment_health",
            Self::AlertServices => "alert_services",
            Self::CurrentAlerts => "current_alerts",
            Self::HistoricalAlerts => "historical_alerts",
            Self::AuditTrail => "audit_trail",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A section left empty because its collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableSection {
    /// The degraded section.
    pub section: Section,
    /// Which collaborator failed.
    pub collaborator: Collaborator,
    /// Failure message.
    pub reason: String,
}

/// Everything known about one cluster for one report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSnapshot {
    /// Cluster identity.
    pub cluster: ClusterIdentity,
    /// Deployment environment.
    pub environment: Environment,
    /// Lookback window in days, shared by every windowed section.
    pub lookback_days: u32,
    /// Support state.
    pub support: SupportStatus,
    /// Service logs within the window, newest first.
    pub service_logs: Vec<ServiceLogEntry>,
    /// Open tickets for the cluster.
    pub jira_issues: Vec<Issue>,
    /// Organization-wide support exceptions.
    pub support_exceptions: Vec<Issue>,
    /// Alerting service ids, in report order.
    pub alert_service_ids: Vec<String>,
    /// Current incidents per service id.
    pub current_alerts: BTreeMap<String, Vec<Incident>>,
    /// Historical incident trackers per service id.
    pub historical_alerts: BTreeMap<String, Vec<IncidentOccurrenceTracker>>,
    /// Sum of all historical tracker counts.
    pub historical_incident_total: u64,
    /// Classified audit-trail events.
    pub audit_events: Vec<AuditEvent>,
    /// Environment health links, when available.
    pub environment_health: Option<HealthDetails>,
    /// Deep links.
    pub links: DiagnosticLinks,
    /// Sections that degraded during assembly.
    pub unavailable: Vec<UnavailableSection>,
}

impl ContextSnapshot {
    /// True when the cluster has no limited-support reasons.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.support.limited_support_reasons.is_empty()
    }

    /// Current incidents for a service; empty when unknown.
    #[must_use]
    pub fn current_alerts_for(&self, service_id: &str) -> &[Incident] {
        self.current_alerts
            .get(service_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Historical trackers for a service; empty when unknown.
    #[must_use]
    pub fn historical_alerts_for(&self, service_id: &str) -> &[IncidentOccurrenceTracker] {
        self.historical_alerts
            .get(service_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Urgency breakdown over current incidents of every listed service.
    #[must_use]
    pub fn current_alert_breakdown(&self) -> UrgencyBreakdown {
        UrgencyBreakdown::from_incidents(
            self.alert_service_ids
                .iter()
                .flat_map(|id| self.current_alerts_for(id)),
        )
    }

    /// The failure recorded for `section`, if it degraded.
    #[must_use]
    pub fn unavailable(&self, section: Section) -> Option<&UnavailableSection> {
        self.unavailable.iter().find(|u| u.section == section)
    }

    /// Web link for an alerting service, falling back to the bare id.
    #[must_use]
    pub fn alert_service_link(&self, service_id: &str) -> String {
        self.links
            .alert_services
            .iter()
            .find(|l| l.service_id == service_id)
            .map_or_else(|| service_id.to_string(), |l| l.url.clone())
    }
}
