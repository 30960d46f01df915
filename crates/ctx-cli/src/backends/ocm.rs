//! OCM inventory backend.
//!
//! Serves cluster lookup, support status, service logs and environment
//! health links from the clusters, accounts and service-log APIs.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use ctx_context::{
    BanStatus, ClusterFetcher, ClusterIdentity, Environment, EnvironmentHealthFetcher,
    HealthDetails, LimitedSupportReason, ServiceLogEntry, ServiceLogFetcher, SourceError,
    SourceResult, SupportStatus, Topology,
};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{require_token, send_json};

/// Subscription label naming the cluster's regional health tenant.
pub const HEALTH_TENANT_LABEL: &str = "dynatrace.regional-tenant";

/// Service name of operator-facing service-log messages.
pub const OPERATOR_SERVICE_NAME: &str = "SREManualAction";

const SERVICE_LOG_PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ItemList<T> {
    #[serde(default)]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IdRef {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HypershiftWire {
    enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VersionWire {
    raw_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusWire {
    state: String,
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DnsWire {
    base_domain: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClusterWire {
    id: String,
    external_id: String,
    infra_id: String,
    name: String,
    creation_timestamp: Option<DateTime<Utc>>,
    openshift_version: String,
    hypershift: Option<HypershiftWire>,
    version: Option<VersionWire>,
    status: Option<StatusWire>,
    state: String,
    dns: Option<DnsWire>,
    subscription: Option<IdRef>,
}

impl ClusterWire {
    fn into_identity(self, organization_id: Option<String>) -> ClusterIdentity {
        let version = self
            .version
            .map(|v| v.raw_id)
            .filter(|v| !v.is_empty())
            .unwrap_or(self.openshift_version);
        let description = match self.status {
            Some(status) if !status.description.is_empty() => status.description,
            Some(status) if !status.state.is_empty() => status.state,
            _ => self.state,
        };

        ClusterIdentity {
            id: self.id,
            external_id: self.external_id,
            infra_id: self.infra_id,
            name: self.name,
            created_at: self.creation_timestamp,
            topology: Topology::from_hosted_flag(self.hypershift.is_some_and(|h| h.enabled)),
            version,
            description,
            base_domain: self
                .dns
                .map(|d| d.base_domain)
                .filter(|d| !d.is_empty()),
            subscription_id: self.subscription.map(|s| s.id).filter(|s| !s.is_empty()),
            organization_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubscriptionWire {
    organization_id: String,
    creator: Option<IdRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AccountWire {
    banned: bool,
    ban_code: String,
    ban_description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LabelWire {
    key: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ManagementWire {
    management_cluster: String,
}

#[derive(Debug, Deserialize)]
struct ServiceLogWire {
    timestamp: DateTime<Utc>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    severity: String,
}

impl From<ServiceLogWire> for ServiceLogEntry {
    fn from(wire: ServiceLogWire) -> Self {
        Self {
            timestamp: wire.timestamp,
            description: wire.description,
            summary: wire.summary,
            severity: wire.severity,
        }
    }
}

/// Search expression matching a cluster by id, external id or name.
///
/// Keys containing quotes are rejected so they cannot alter the expression.
pub fn cluster_search(key: &str) -> SourceResult<String> {
    if key.is_empty() || key.contains('\'') {
        return Err(SourceError::NotFound(key.to_string()));
    }
    Ok(format!(
        "id = '{key}' or external_id = '{key}' or name = '{key}'"
    ))
}

/// Search expression for service logs since `since`.
pub fn service_log_search(
    cluster_id: &str,
    since: DateTime<Utc>,
    all_messages: bool,
    internal_only: bool,
) -> String {
    let mut search = format!(
        "cluster_id = '{cluster_id}' and timestamp >= '{}'",
        since.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    if !all_messages {
        search.push_str(&format!(" and service_name = '{OPERATOR_SERVICE_NAME}'"));
    }
    if internal_only {
        search.push_str(" and internal_only = 'true'");
    }
    search
}

/// Inventory client.
#[derive(Debug, Clone)]
pub struct OcmClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl OcmClient {
    /// Creates a client for `base_url`.
    pub fn new(http: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> SourceResult<T> {
        let token = require_token(self.token.as_deref(), "OCM_TOKEN")?;
        debug!(path, "ocm request");
        send_json(
            self.http
                .get(format!("{}{path}", self.base_url))
                .bearer_auth(token)
                .query(query),
        )
        .await
    }

    async fn search_cluster(&self, key: &str) -> SourceResult<ClusterWire> {
        let search = cluster_search(key)?;
        let list: ItemList<ClusterWire> = self
            .get(
                "/api/clusters_mgmt/v1/clusters",
                &[("search", search.as_str()), ("size", "1")],
            )
            .await?;
        list.items
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound(key.to_string()))
    }

    async fn subscription(&self, subscription_id: &str) -> SourceResult<SubscriptionWire> {
        self.get(
            &format!("/api/accounts_mgmt/v1/subscriptions/{subscription_id}"),
            &[],
        )
        .await
    }

    async fn ban_status(&self, subscription_id: Option<&str>) -> SourceResult<BanStatus> {
        let Some(subscription_id) = subscription_id else {
            return Ok(BanStatus::default());
        };
        let subscription = self.subscription(subscription_id).await?;
        let Some(creator) = subscription.creator.filter(|c| !c.id.is_empty()) else {
            return Ok(BanStatus::default());
        };
        let account: AccountWire = self
            .get(&format!("/api/accounts_mgmt/v1/accounts/{}", creator.id), &[])
            .await?;
        Ok(BanStatus {
            banned: account.banned,
            code: account.ban_code,
            description: account.ban_description,
        })
    }

    async fn limited_support_reasons(
        &self,
        cluster_id: &str,
    ) -> SourceResult<Vec<LimitedSupportReason>> {
        let list: ItemList<LimitedSupportReason> = self
            .get(
                &format!("/api/clusters_mgmt/v1/clusters/{cluster_id}/limited_support_reasons"),
                &[],
            )
            .await?;
        Ok(list.items)
    }

    /// Subscription whose labels carry the health tenant: the management
    /// cluster's for hosted control planes, the cluster's own otherwise.
    async fn health_subscription(&self, cluster: &ClusterIdentity) -> SourceResult<Option<String>> {
        if !cluster.topology.is_hosted() {
            return Ok(cluster.subscription_id.clone());
        }
        let management: ManagementWire = self
            .get(
                &format!("/api/clusters_mgmt/v1/clusters/{}/hypershift", cluster.id),
                &[],
            )
            .await?;
        if management.management_cluster.is_empty() {
            return Ok(None);
        }
        let wire = self.search_cluster(&management.management_cluster).await?;
        Ok(wire.subscription.map(|s| s.id).filter(|s| !s.is_empty()))
    }
}

/// Health links for a regional tenant.
pub fn health_details(tenant: &str) -> HealthDetails {
    let tenant_url = format!("https://{tenant}.apps.dynatrace.com");
    HealthDetails {
        logs_url: format!("{tenant_url}/ui/apps/dynatrace.logs"),
        tenant_url,
    }
}

#[async_trait]
impl ClusterFetcher for OcmClient {
    fn environment(&self) -> Environment {
        Environment::from_api_url(&self.base_url)
    }

    async fn get_cluster(&self, key: &str) -> SourceResult<ClusterIdentity> {
        let wire = self.search_cluster(key).await?;

        let organization_id = match wire.subscription.as_ref().filter(|s| !s.id.is_empty()) {
            Some(subscription) => match self.subscription(&subscription.id).await {
                Ok(sub) if !sub.organization_id.is_empty() => Some(sub.organization_id),
                Ok(_) => None,
                Err(err) => {
                    warn!(
                        subscription_id = %subscription.id,
                        error = %err,
                        "subscription lookup failed"
                    );
                    None
                }
            },
            None => None,
        };

        Ok(wire.into_identity(organization_id))
    }

    async fn support_status(&self, cluster: &ClusterIdentity) -> SourceResult<SupportStatus> {
        let (limited_support_reasons, ban) = futures::try_join!(
            self.limited_support_reasons(&cluster.id),
            self.ban_status(cluster.subscription_id.as_deref()),
        )?;
        Ok(SupportStatus {
            limited_support_reasons,
            ban,
        })
    }
}

#[async_trait]
impl ServiceLogFetcher for OcmClient {
    async fn logs_since(
        &self,
        cluster_id: &str,
        since: DateTime<Utc>,
        all_messages: bool,
        internal_only: bool,
    ) -> SourceResult<Vec<ServiceLogEntry>> {
        let search = service_log_search(cluster_id, since, all_messages, internal_only);
        let list: ItemList<ServiceLogWire> = self
            .get(
                "/api/service_logs/v1/cluster_logs",
                &[
                    ("search", search.as_str()),
                    ("orderBy", "timestamp desc"),
                    ("size", SERVICE_LOG_PAGE_SIZE),
                ],
            )
            .await?;
        Ok(list.items.into_iter().map(ServiceLogEntry::from).collect())
    }
}

#[async_trait]
impl EnvironmentHealthFetcher for OcmClient {
    async fn fetch_cluster_details(
        &self,
        cluster: &ClusterIdentity,
    ) -> SourceResult<Option<HealthDetails>> {
        let Some(subscription_id) = self.health_subscription(cluster).await? else {
            return Ok(None);
        };
        let labels: ItemList<LabelWire> = self
            .get(
                &format!("/api/accounts_mgmt/v1/subscriptions/{subscription_id}/labels"),
                &[],
            )
            .await?;
        Ok(labels
            .items
            .into_iter()
            .find(|label| label.key == HEALTH_TENANT_LABEL && !label.value.is_empty())
            .map(|label| health_details(&label.value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CLUSTER_JSON: &str = r#"{
        "kind": "ClusterList",
        "items": [{
            "id": "mock-cluster-id",
            "external_id": "mock-external-id",
            "infra_id": "mock-infra-id",
            "name": "mock-cluster",
            "creation_timestamp": "2024-01-01T10:00:00Z",
            "openshift_version": "4.15.2",
            "version": {"raw_id": "4.15.3"},
            "hypershift": {"enabled": true},
            "state": "ready",
            "status": {"state": "ready", "description": ""},
            "dns": {"base_domain": "mock.example.com"},
            "subscription": {"kind": "SubscriptionLink", "id": "mock-subscription-id"}
        }]
    }"#;

    #[test]
    fn cluster_json_maps_to_identity() {
        let list: ItemList<ClusterWire> = serde_json::from_str(CLUSTER_JSON).expect("parse");
        let identity = list
            .items
            .into_iter()
            .next()
            .expect("one item")
            .into_identity(Some("mock-org-id".into()));

        assert_eq!(identity.id, "mock-cluster-id");
        assert_eq!(identity.infra_id, "mock-infra-id");
        assert_eq!(identity.topology, Topology::HostedControlPlane);
        assert_eq!(identity.version, "4.15.3");
        assert_eq!(identity.description, "ready");
        assert_eq!(identity.base_domain.as_deref(), Some("mock.example.com"));
        assert_eq!(identity.subscription_id.as_deref(), Some("mock-subscription-id"));
        assert_eq!(identity.organization_id.as_deref(), Some("mock-org-id"));
        assert_eq!(
            identity.created_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).single()
        );
    }

    #[test]
    fn sparse_cluster_json_defaults_to_standalone() {
        let wire: ClusterWire =
            serde_json::from_str(r#"{"id": "c1", "name": "n1", "openshift_version": "4.14.0"}"#)
                .expect("parse");
        let identity = wire.into_identity(None);
        assert_eq!(identity.topology, Topology::Standalone);
        assert_eq!(identity.version, "4.14.0");
        assert_eq!(identity.base_domain, None);
    }

    #[test]
    fn cluster_search_matches_every_key_kind() {
        let search = cluster_search("abc").expect("search");
        assert_eq!(search, "id = 'abc' or external_id = 'abc' or name = 'abc'");
        assert!(matches!(cluster_search("a' or '1"), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn service_log_search_filters() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("date");
        let operator = service_log_search("c1", since, false, false);
        assert_eq!(
            operator,
            "cluster_id = 'c1' and timestamp >= '2024-01-01T00:00:00Z' and service_name = 'SREManualAction'"
        );
        let internal = service_log_search("c1", since, true, true);
        assert!(!internal.contains("service_name"));
        assert!(internal.ends_with("and internal_only = 'true'"));
    }

    #[test]
    fn service_log_json_maps_to_entries() {
        let list: ItemList<ServiceLogWire> = serde_json::from_str(
            r#"{"items": [{"timestamp": "2024-01-02T03:04:05Z", "description": "Upgrade done", "summary": "Upgrade", "severity": "Info", "service_name": "SREManualAction"}]}"#,
        )
        .expect("parse");
        let entries: Vec<ServiceLogEntry> = list.items.into_iter().map(Into::into).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "Upgrade done");
        assert_eq!(entries[0].severity, "Info");
    }

    #[test]
    fn service_log_list_without_items_is_empty() {
        let list: ItemList<ServiceLogWire> =
            serde_json::from_str(r#"{"kind": "ClusterLogList", "total": 0}"#).expect("parse");
        assert!(list.items.is_empty());
    }

    #[test]
    fn health_details_from_tenant() {
        let details = health_details("abc123");
        assert_eq!(details.tenant_url, "https://abc123.apps.dynatrace.com");
        assert_eq!(
            details.logs_url,
            "https://abc123.apps.dynatrace.com/ui/apps/dynatrace.logs"
        );
    }

    #[test]
    fn environment_from_base_url() {
        let http = reqwest::Client::new();
        let stage = OcmClient::new(http.clone(), "https://api.stage.openshift.com/", None);
        assert_eq!(stage.environment(), Environment::Stage);
        let prod = OcmClient::new(http, "https://api.openshift.com", None);
        assert_eq!(prod.environment(), Environment::Production);
    }

    #[tokio::test]
    async fn missing_token_is_unavailable() {
        let client = OcmClient::new(reqwest::Client::new(), "https://api.openshift.com", None);
        let err = client.get_cluster("abc").await.expect_err("no token");
        assert!(matches!(err, SourceError::Unavailable(msg) if msg.contains("OCM_TOKEN")));
    }
}
