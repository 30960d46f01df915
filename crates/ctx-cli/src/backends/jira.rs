//! Jira issue tracker backend (REST v2 search).

use async_trait::async_trait;
use ctx_context::{Issue, JiraIssueFetcher, SourceResult};
use serde::Deserialize;
use tracing::debug;

use super::{require_token, send_json};
use crate::config::JiraConfig;

const SEARCH_FIELDS: &str = "summary,issuetype,priority,status";
const MAX_RESULTS: &str = "50";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Named {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FieldsWire {
    summary: String,
    issuetype: Option<Named>,
    priority: Option<Named>,
    status: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct IssueWire {
    key: String,
    #[serde(default)]
    fields: FieldsWire,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchWire {
    issues: Vec<IssueWire>,
}

fn name(field: Option<Named>) -> String {
    field.map(|n| n.name).unwrap_or_default()
}

/// JQL for open tickets mentioning the cluster.
pub fn cluster_jql(project: &str, cluster_id: &str, external_id: &str) -> String {
    format!(
        "project = {project} AND (\"Cluster ID\" ~ \"{cluster_id}\" OR \"Cluster ID\" ~ \"{external_id}\" OR description ~ \"{cluster_id}\" OR description ~ \"{external_id}\") AND status != Closed ORDER BY created DESC"
    )
}

/// JQL for support exceptions filed for an organization.
pub fn exceptions_jql(project: &str, organization_id: &str) -> String {
    format!(
        "project = {project} AND (\"Organization ID\" ~ \"{organization_id}\" OR description ~ \"{organization_id}\") AND status != Closed ORDER BY created DESC"
    )
}

/// Issue tracker client.
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    cluster_project: String,
    exceptions_project: String,
}

impl JiraClient {
    /// Creates a client from the `[jira]` section.
    pub fn new(http: reqwest::Client, config: &JiraConfig, token: Option<String>) -> Self {
        Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            token,
            cluster_project: config.cluster_project.clone(),
            exceptions_project: config.exceptions_project.clone(),
        }
    }

    async fn search(&self, jql: &str) -> SourceResult<Vec<Issue>> {
        let token = require_token(self.token.as_deref(), "JIRA_API_TOKEN")?;
        debug!(jql, "jira search");
        let result: SearchWire = send_json(
            self.http
                .get(format!("{}/rest/api/2/search", self.base_url))
                .bearer_auth(token)
                .query(&[
                    ("jql", jql),
                    ("fields", SEARCH_FIELDS),
                    ("maxResults", MAX_RESULTS),
                ]),
        )
        .await?;
        Ok(self.issues(result))
    }

    fn issues(&self, result: SearchWire) -> Vec<Issue> {
        result
            .issues
            .into_iter()
            .map(|wire| Issue {
                url: format!("{}/browse/{}", self.base_url, wire.key),
                key: wire.key,
                summary: wire.fields.summary,
                issue_type: name(wire.fields.issuetype),
                priority: name(wire.fields.priority),
                status: name(wire.fields.status),
            })
            .collect()
    }
}

#[async_trait]
impl JiraIssueFetcher for JiraClient {
    async fn issues_for_cluster(
        &self,
        cluster_id: &str,
        external_id: &str,
    ) -> SourceResult<Vec<Issue>> {
        self.search(&cluster_jql(&self.cluster_project, cluster_id, external_id))
            .await
    }

    async fn support_exceptions_for_org(&self, organization_id: &str) -> SourceResult<Vec<Issue>> {
        self.search(&exceptions_jql(&self.exceptions_project, organization_id))
            .await
    }
}
