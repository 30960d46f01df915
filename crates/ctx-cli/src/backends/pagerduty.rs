//! PagerDuty alerting backend (REST v2).

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use ctx_alerts::{Incident, IncidentOccurrenceTracker};
use ctx_context::{AlertFetcher, ClusterIdentity, SourceResult};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{require_token, send_json};

const ACCEPT: &str = "application/vnd.pagerduty+json;version=2";
const PAGE_SIZE: usize = 100;

/// Maximum pages of resolved incidents read per service.
pub const MAX_HISTORY_PAGES: usize = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceWire {
    id: String,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServicesWire {
    services: Vec<ServiceWire>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IncidentsWire {
    incidents: Vec<Incident>,
    more: bool,
}

/// Alerting client.
#[derive(Debug, Clone)]
pub struct PagerDutyClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl PagerDutyClient {
    /// Creates a client for `api_url`.
    pub fn new(http: reqwest::Client, api_url: &str, token: Option<String>) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> SourceResult<T> {
        let token = require_token(self.token.as_deref(), "PAGERDUTY_TOKEN")?;
        debug!(path, "pagerduty request");
        send_json(
            self.http
                .get(format!("{}{path}", self.api_url))
                .header(reqwest::header::ACCEPT, ACCEPT)
                .header(reqwest::header::AUTHORIZATION, format!("Token token={token}"))
                .query(query),
        )
        .await
    }

    async fn incidents_page(
        &self,
        service_id: &str,
        statuses: &[&str],
        since: Option<DateTime<Utc>>,
        offset: usize,
    ) -> SourceResult<IncidentsWire> {
        let mut query = vec![
            ("service_ids[]", service_id.to_string()),
            ("limit", PAGE_SIZE.to_string()),
            ("offset", offset.to_string()),
        ];
        query.extend(statuses.iter().map(|s| ("statuses[]", (*s).to_string())));
        if let Some(since) = since {
            query.push(("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
            query.push(("until", Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        self.get("/incidents", &query).await
    }
}

#[async_trait]
impl AlertFetcher for PagerDutyClient {
    async fn service_ids(&self, cluster: &ClusterIdentity) -> SourceResult<Vec<String>> {
        let Some(base_domain) = cluster.base_domain.as_deref() else {
            debug!(cluster_id = %cluster.id, "no base domain, skipping service discovery");
            return Ok(Vec::new());
        };
        let result: ServicesWire = self
            .get(
                "/services",
                &[
                    ("query", base_domain.to_string()),
                    ("limit", PAGE_SIZE.to_string()),
                ],
            )
            .await?;
        debug!(
            services = ?result.services.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "discovered alerting services"
        );
        Ok(result.services.into_iter().map(|s| s.id).collect())
    }

    async fn current_incidents(&self, service_id: &str) -> SourceResult<Vec<Incident>> {
        let page = self
            .incidents_page(service_id, &["triggered", "acknowledged"], None, 0)
            .await?;
        Ok(page.incidents)
    }

    async fn historical_incidents(
        &self,
        service_id: &str,
        since: DateTime<Utc>,
    ) -> SourceResult<Vec<IncidentOccurrenceTracker>> {
        let mut incidents = Vec::new();
        let mut more = true;
        let mut pages = 0;
        while more && pages < MAX_HISTORY_PAGES {
            let page = self
                .incidents_page(service_id, &["resolved"], Some(since), incidents.len())
                .await?;
            more = page.more;
            pages += 1;
            incidents.extend(page.incidents);
        }
        if more {
            warn!(service_id, pages, "incident history truncated");
        }
        Ok(IncidentOccurrenceTracker::tally(&incidents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctx_alerts::Urgency;
    use ctx_context::SourceError;

    #[test]
    fn incidents_json_maps_to_incidents() {
        let page: IncidentsWire = serde_json::from_str(
            r#"{
                "incidents": [
                    {"id": "Q1", "incident_key": "k1", "title": "ClusterOperatorDown",
                     "urgency": "high", "status": "triggered",
                     "created_at": "2024-01-02T03:04:05Z",
                     "html_url": "https://redhat.pagerduty.com/incidents/Q1",
                     "service": {"id": "PD12345"}},
                    {"id": "Q2", "title": "Odd", "urgency": "medium", "status": "acknowledged"}
                ],
                "limit": 100, "offset": 0, "more": true
            }"#,
        )
        .expect("parse");

        assert!(page.more);
        assert_eq!(page.incidents.len(), 2);
        assert_eq!(page.incidents[0].urgency, Urgency::High);
        assert_eq!(page.incidents[0].incident_key.as_deref(), Some("k1"));
        assert_eq!(page.incidents[1].urgency, Urgency::Unknown);
    }

    #[test]
    fn services_json_keeps_api_order() {
        let result: ServicesWire = serde_json::from_str(
            r#"{"services": [{"id": "PD2", "name": "b"}, {"id": "PD1", "name": "a"}], "more": false}"#,
        )
        .expect("parse");
        let ids: Vec<String> = result.services.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["PD2", "PD1"]);
    }

    #[tokio::test]
    async fn no_base_domain_discovers_nothing() {
        let client =
            PagerDutyClient::new(reqwest::Client::new(), "https://api.pagerduty.com", None);
        let ids = client
            .service_ids(&ClusterIdentity::default())
            .await
            .expect("no call made");
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn missing_token_is_unavailable() {
        let client = PagerDutyClient::new(reqwest::Client::new(), "https://api.pagerduty.com", None);
        let err = client.current_incidents("PD1").await.expect_err("no token");
        assert!(matches!(err, SourceError::Unavailable(msg) if msg.contains("PAGERDUTY_TOKEN")));
    }
}
