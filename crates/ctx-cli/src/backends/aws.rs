//! `CloudTrail` audit trail through the AWS CLI.
//!
//! Each page is one `aws cloudtrail lookup-events` invocation; `NextToken`
//! is followed until it runs out or the page limit is reached. Only
//! write events are requested.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ctx_audit::AuditEvent;
use ctx_context::{AuditTrailFetcher, ClusterIdentity, SourceError, SourceResult};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

const ITEMS_PER_PAGE: &str = "50";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EventWire {
    event_id: String,
    event_name: String,
    event_time: DateTime<Utc>,
    #[serde(default)]
    username: Option<String>,
}

impl From<EventWire> for AuditEvent {
    fn from(wire: EventWire) -> Self {
        Self {
            id: wire.event_id,
            name: wire.event_name,
            actor: wire.username,
            timestamp: wire.event_time,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct LookupPage {
    events: Vec<EventWire>,
    next_token: Option<String>,
}

/// Audit trail client shelling out to the AWS CLI.
#[derive(Debug, Clone)]
pub struct CloudTrailClient {
    program: String,
    base_args: Vec<String>,
    profile: Option<String>,
    region: Option<String>,
}

impl CloudTrailClient {
    /// Creates a client using `aws` from `PATH`.
    pub fn new(profile: Option<String>, region: Option<String>) -> Self {
        Self::with_command("aws", ["cloudtrail", "lookup-events"], profile, region)
    }

    /// Creates a client running `program` with `base_args` before the
    /// lookup arguments.
    pub fn with_command<I, S>(
        program: impl Into<String>,
        base_args: I,
        profile: Option<String>,
        region: Option<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            base_args: base_args.into_iter().map(Into::into).collect(),
            profile,
            region,
        }
    }

    /// Arguments for one page.
    pub fn page_args(&self, next_token: Option<&str>) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend(
            [
                "--lookup-attributes",
                "AttributeKey=ReadOnly,AttributeValue=false",
                "--max-items",
                ITEMS_PER_PAGE,
                "--output",
                "json",
            ]
            .map(str::to_string),
        );
        if let Some(profile) = &self.profile {
            args.extend(["--profile".to_string(), profile.clone()]);
        }
        if let Some(region) = &self.region {
            args.extend(["--region".to_string(), region.clone()]);
        }
        if let Some(token) = next_token {
            args.extend(["--starting-token".to_string(), token.to_string()]);
        }
        args
    }

    async fn page(&self, next_token: Option<&str>) -> SourceResult<LookupPage> {
        let output = Command::new(&self.program)
            .args(self.page_args(next_token))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SourceError::unavailable(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::unavailable(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| SourceError::malformed(e.to_string()))
    }
}

#[async_trait]
impl AuditTrailFetcher for CloudTrailClient {
    async fn lookup_events(
        &self,
        cluster: &ClusterIdentity,
        page_limit: u32,
    ) -> SourceResult<Vec<AuditEvent>> {
        let mut events = Vec::new();
        let mut next_token: Option<String> = None;

        for page_number in 0..page_limit {
            let page = self.page(next_token.as_deref()).await?;
            debug!(
                infra_id = %cluster.infra_id,
                page = page_number + 1,
                events = page.events.len(),
                "read audit page"
            );
            events.extend(page.events.into_iter().map(AuditEvent::from));
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(events)
    }
}
