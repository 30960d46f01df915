//! Collaborator backends over the real services.
//!
//! - [`ocm`] - cluster inventory, support status, service logs, health links
//! - [`jira`] - cluster tickets and support exceptions
//! - [`pagerduty`] - alerting services and incidents
//! - [`aws`] - `CloudTrail` events through the AWS CLI
//!
//! A backend without credentials still constructs; its calls report
//! [`SourceError::Unavailable`] so the report degrades per section.

pub mod aws;
pub mod jira;
pub mod ocm;
pub mod pagerduty;

use std::sync::Arc;
use std::time::Duration;

use ctx_context::{Collaborators, SourceError, SourceResult};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::cli::ContextArgs;
use crate::config::Config;
use crate::error::CliError;

pub use aws::CloudTrailClient;
pub use jira::JiraClient;
pub use ocm::OcmClient;
pub use pagerduty::PagerDutyClient;

/// User agent sent on every HTTP request.
pub const USER_AGENT: &str = concat!("clusterctx/", env!("CARGO_PKG_VERSION"));

/// Per-request HTTP timeout.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the shared HTTP client.
pub fn http_client() -> Result<reqwest::Client, CliError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| CliError::Config(format!("failed to build HTTP client: {e}")))
}

/// Builds every collaborator from configuration, with flags taking precedence.
pub fn collaborators(config: &Config, args: &ContextArgs) -> Result<Collaborators, CliError> {
    let http = http_client()?;

    let ocm = Arc::new(OcmClient::new(
        http.clone(),
        &config.ocm.url,
        args.ocm_token.clone().or_else(|| config.ocm.token.clone()),
    ));
    let jira = Arc::new(JiraClient::new(
        http.clone(),
        &config.jira,
        args.jira_token.clone().or_else(|| config.jira.token.clone()),
    ));
    let pagerduty = Arc::new(PagerDutyClient::new(
        http,
        &config.pagerduty.api_url,
        args.pagerduty_token
            .clone()
            .or_else(|| config.pagerduty.token.clone()),
    ));
    let audit = Arc::new(CloudTrailClient::new(
        args.profile.clone().or_else(|| config.aws.profile.clone()),
        config.aws.region.clone(),
    ));

    Ok(Collaborators {
        clusters: ocm.clone(),
        issues: jira,
        health: ocm.clone(),
        service_logs: ocm,
        alerts: pagerduty,
        audit,
    })
}

/// Returns the token or an `Unavailable` error naming the setting.
pub(crate) fn require_token<'a>(token: Option<&'a str>, setting: &str) -> SourceResult<&'a str> {
    token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SourceError::unavailable(format!("no token configured (set {setting})")))
}

/// Sends a request and decodes a JSON body.
///
/// 404 maps to `NotFound`, any other non-success status to `Unavailable`
/// carrying the status line, and an undecodable body to `Malformed`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> SourceResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::unavailable(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(status.to_string()));
    }
    if !status.is_success() {
        return Err(SourceError::unavailable(status.to_string()));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::malformed(e.to_string()))
}
