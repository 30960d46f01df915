//! Diagnostic deep links.
//!
//! The audit-log link branches on topology first: hosted control planes are
//! searched by cluster id and name, standalone clusters by infra id only. An
//! unrecognized environment yields no audit link at all.

use url::form_urlencoded::byte_serialize;

use crate::snapshot::{ClusterIdentity, DiagnosticLinks, Environment, ServiceLink, Topology};

/// Audit index for hosted control planes.
pub const HCP_AUDIT_INDEX: &str = "openshift_managed_hypershift_audit";

/// Audit index for standalone clusters.
pub const STANDALONE_AUDIT_INDEX: &str = "openshift_managed_audit";

/// Suffix appended to either index in the stage environment.
pub const STAGE_INDEX_SUFFIX: &str = "_stage";

/// Default audit search base URL.
pub const DEFAULT_AUDIT_SEARCH_URL: &str = "https://osdsecuritylogs.splunkcloud.com";

/// Default issue tracker base URL.
pub const DEFAULT_ISSUE_TRACKER_URL: &str = "https://issues.redhat.com";

/// Default project searched for cluster tickets.
pub const DEFAULT_TICKET_PROJECT: &str = "OHSS";

/// Default cluster dashboard base URL.
pub const DEFAULT_DASHBOARD_URL: &str = "https://console.redhat.com/openshift/insights/advisor";

/// Default alerting web UI base URL.
pub const DEFAULT_ALERTING_WEB_URL: &str = "https://redhat.pagerduty.com";

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// Builds deep links from cluster identity and environment.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    audit_search_url: String,
    issue_tracker_url: String,
    ticket_project: String,
    dashboard_url: String,
    alerting_web_url: String,
}

impl Default for LinkBuilder {
    fn default() -> Self {
        Self {
            audit_search_url: DEFAULT_AUDIT_SEARCH_URL.to_string(),
            issue_tracker_url: DEFAULT_ISSUE_TRACKER_URL.to_string(),
            ticket_project: DEFAULT_TICKET_PROJECT.to_string(),
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            alerting_web_url: DEFAULT_ALERTING_WEB_URL.to_string(),
        }
    }
}

impl LinkBuilder {
    /// Creates a builder with the default base URLs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the audit search base URL.
    #[must_use]
    pub fn audit_search_url(mut self, url: impl Into<String>) -> Self {
        self.audit_search_url = trim_base(url.into());
        self
    }

    /// Overrides the issue tracker base URL.
    #[must_use]
    pub fn issue_tracker_url(mut self, url: impl Into<String>) -> Self {
        self.issue_tracker_url = trim_base(url.into());
        self
    }

    /// Overrides the project searched for cluster tickets.
    #[must_use]
    pub fn ticket_project(mut self, project: impl Into<String>) -> Self {
        self.ticket_project = project.into();
        self
    }

    /// Overrides the dashboard base URL.
    #[must_use]
    pub fn dashboard_url(mut self, url: impl Into<String>) -> Self {
        self.dashboard_url = trim_base(url.into());
        self
    }

    /// Overrides the alerting web UI base URL.
    #[must_use]
    pub fn alerting_web_url(mut self, url: impl Into<String>) -> Self {
        self.alerting_web_url = trim_base(url.into());
        self
    }

    /// Audit-log search link, or `None` outside production and stage.
    #[must_use]
    pub fn audit_log_link(&self, cluster: &ClusterIdentity, env: &Environment) -> Option<String> {
        let stage = match env {
            Environment::Production => false,
            Environment::Stage => true,
            Environment::Other(_) => return None,
        };
        let suffix = if stage { STAGE_INDEX_SUFFIX } else { "" };

        let url = match cluster.topology {
            Topology::HostedControlPlane => {
                let label = if stage { "staging" } else { "production" };
                format!(
                    "{}/en-US/app/search/search?q=search%20index%3D%22{HCP_AUDIT_INDEX}{suffix}%22%20annotations.managed.openshift.io%2Fhosted-cluster-id%3Docm-{label}-{}-{}",
                    self.audit_search_url,
                    encode(&cluster.id),
                    encode(&cluster.name),
                )
            }
            Topology::Standalone => format!(
                "{}/en-US/app/search/search?q=search%20index%3D%22{STANDALONE_AUDIT_INDEX}{suffix}%22%20clusterid%3D%22{}%22",
                self.audit_search_url,
                encode(&cluster.infra_id),
            ),
        };
        Some(url)
    }

    /// Issue-tracker search for tickets mentioning the cluster id or external id.
    #[must_use]
    pub fn ticket_search_link(&self, cluster: &ClusterIdentity) -> String {
        let jql = format!(
            "project = {} AND (\"Cluster ID\" ~ \"{id}\" OR \"Cluster ID\" ~ \"{ext}\" OR description ~ \"{id}\" OR description ~ \"{ext}\")",
            self.ticket_project,
            id = cluster.id,
            ext = cluster.external_id,
        );
        format!("{}/issues/?jql={}", self.issue_tracker_url, encode(&jql))
    }

    /// Browse URL for a ticket key.
    #[must_use]
    pub fn issue_link(&self, key: &str) -> String {
        format!("{}/browse/{key}", self.issue_tracker_url)
    }

    /// Cluster dashboard link.
    #[must_use]
    pub fn dashboard_link(&self, cluster: &ClusterIdentity) -> String {
        format!("{}/clusters/{}", self.dashboard_url, encode(&cluster.external_id))
    }

    /// Service-directory link for an alerting service.
    #[must_use]
    pub fn alert_service_link(&self, service_id: &str) -> String {
        format!("{}/service-directory/{service_id}", self.alerting_web_url)
    }

    /// Builds every link for the snapshot.
    #[must_use]
    pub fn build(
        &self,
        cluster: &ClusterIdentity,
        env: &Environment,
        service_ids: &[String],
    ) -> DiagnosticLinks {
        DiagnosticLinks {
            audit_logs: self.audit_log_link(cluster, env),
            ticket_search: self.ticket_search_link(cluster),
            dashboard: self.dashboard_link(cluster),
            alert_services: service_ids
                .iter()
                .map(|id| ServiceLink {
                    service_id: id.clone(),
                    url: self.alert_service_link(id),
                })
                .collect(),
        }
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn cluster(topology: Topology) -> ClusterIdentity {
        ClusterIdentity {
            id: "mock-cluster-id".into(),
            external_id: "mock-external-id".into(),
            infra_id: "mock-infra-id".into(),
            name: "mock-cluster".into(),
            topology,
            ..ClusterIdentity::default()
        }
    }

    #[test]
    fn hosted_production_uses_id_and_name() {
        let link = LinkBuilder::default()
            .audit_log_link(&cluster(Topology::HostedControlPlane), &Environment::Production)
            .expect("production link");

        assert!(link.contains("openshift_managed_hypershift_audit%22"));
        assert!(link.contains("ocm-production-mock-cluster-id-mock-cluster"));
        assert!(!link.contains("mock-infra-id"));
    }

    #[test]
    fn hosted_stage_uses_suffix_and_staging_label() {
        let link = LinkBuilder::default()
            .audit_log_link(&cluster(Topology::HostedControlPlane), &Environment::Stage)
            .expect("stage link");

        assert!(link.contains("openshift_managed_hypershift_audit_stage%22"));
        assert!(link.contains("ocm-staging-mock-cluster-id-mock-cluster"));
    }

    #[test_case(Environment::Production, "openshift_managed_audit%22" ; "production")]
    #[test_case(Environment::Stage, "openshift_managed_audit_stage%22" ; "stage")]
    fn standalone_uses_infra_id_only(env: Environment, index: &str) {
        let link = LinkBuilder::default()
            .audit_log_link(&cluster(Topology::Standalone), &env)
            .expect("standalone link");

        assert!(link.contains(index));
        assert!(link.contains("clusterid%3D%22mock-infra-id%22"));
        assert!(!link.contains("mock-cluster-id"));
        assert!(!link.contains("mock-cluster%"));
    }

    #[test_case(Topology::HostedControlPlane ; "hosted")]
    #[test_case(Topology::Standalone ; "standalone")]
    fn unknown_environment_has_no_audit_link(topology: Topology) {
        let builder = LinkBuilder::default();
        assert_eq!(
            builder.audit_log_link(&cluster(topology), &Environment::from_tag("unknown")),
            None
        );
        assert_eq!(
            builder.audit_log_link(&cluster(topology), &Environment::from_tag("integration")),
            None
        );
    }

    #[test]
    fn ticket_search_mentions_both_ids() {
        let link = LinkBuilder::default().ticket_search_link(&cluster(Topology::Standalone));
        assert!(link.starts_with("https://issues.redhat.com/issues/?jql="));
        assert!(link.contains("mock-cluster-id"));
        assert!(link.contains("mock-external-id"));
        assert!(!link.contains(' '));
    }

    #[test]
    fn overrides_strip_trailing_slash() {
        let builder = LinkBuilder::new()
            .alerting_web_url("https://alerts.example.com/")
            .issue_tracker_url("https://tickets.example.com/");
        assert_eq!(
            builder.alert_service_link("PD12345"),
            "https://alerts.example.com/service-directory/PD12345"
        );
        assert_eq!(
            builder.issue_link("JIRA-123"),
            "https://tickets.example.com/browse/JIRA-123"
        );
    }

    #[test]
    fn build_links_every_service_in_order() {
        let ids = vec!["PD2".to_string(), "PD1".to_string()];
        let links = LinkBuilder::default().build(
            &cluster(Topology::Standalone),
            &Environment::Production,
            &ids,
        );

        let order: Vec<&str> = links
            .alert_services
            .iter()
            .map(|l| l.service_id.as_str())
            .collect();
        assert_eq!(order, vec!["PD2", "PD1"]);
        assert!(links.audit_logs.is_some());
        assert!(links.dashboard.ends_with("/clusters/mock-external-id"));
    }

    proptest! {
        #[test]
        fn standalone_link_uses_only_infra_id(
            id in "c[a-z0-9]{8}",
            name in "n[a-z0-9]{8}",
            infra in "i[a-z0-9]{8}",
        ) {
            let cluster = ClusterIdentity {
                id: id.clone(),
                name: name.clone(),
                infra_id: infra.clone(),
                ..ClusterIdentity::default()
            };
            let link = LinkBuilder::default()
                .audit_log_link(&cluster, &Environment::Production)
                .expect("production link");
            let expected = format!("clusterid%3D%22{}%22", infra);
            prop_assert!(link.contains(&expected));
            prop_assert!(!link.contains(&id));
            prop_assert!(!link.contains(&name));
        }

        #[test]
        fn hosted_link_uses_id_and_name(
            id in "c[a-z0-9]{8}",
            name in "n[a-z0-9]{8}",
            infra in "i[a-z0-9]{8}",
        ) {
            let cluster = ClusterIdentity {
                id: id.clone(),
                name: name.clone(),
                infra_id: infra.clone(),
                topology: Topology::HostedControlPlane,
                ..ClusterIdentity::default()
            };
            let link = LinkBuilder::default()
                .audit_log_link(&cluster, &Environment::Stage)
                .expect("stage link");
            let expected = format!("ocm-staging-{}-{}", id, name);
            prop_assert!(link.contains(&expected));
            prop_assert!(!link.contains(&infra));
        }
    }
}
