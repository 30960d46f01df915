//! clusterctx configuration.
//!
//! Loaded from TOML. Every section is optional and falls back to the
//! production defaults; command-line flags override whatever is set here.

use std::path::{Path, PathBuf};

use ctx_context::links::{
    DEFAULT_ALERTING_WEB_URL, DEFAULT_AUDIT_SEARCH_URL, DEFAULT_DASHBOARD_URL,
    DEFAULT_ISSUE_TRACKER_URL, DEFAULT_TICKET_PROJECT,
};
use ctx_context::{DEFAULT_AUDIT_PAGE_LIMIT, DEFAULT_LOOKBACK_DAYS, LinkBuilder};
use serde::{Deserialize, Serialize};

use crate::error::CliError;
use crate::output::OutputEncoding;

/// Default inventory API URL.
pub const DEFAULT_OCM_URL: &str = "https://api.openshift.com";

/// Default alerting REST API URL.
pub const DEFAULT_PAGERDUTY_API_URL: &str = "https://api.pagerduty.com";

/// Default project holding support exceptions.
pub const DEFAULT_EXCEPTIONS_PROJECT: &str = "OSDEE";

/// Report defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    /// Output format (`short`, `long`, `json`).
    pub output: String,
    /// Lookback window in days.
    pub days: u32,
    /// Audit trail page limit.
    pub pages: u32,
    /// Include the audit trail by default.
    pub full: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            output: OutputEncoding::default().as_str().to_string(),
            days: DEFAULT_LOOKBACK_DAYS,
            pages: DEFAULT_AUDIT_PAGE_LIMIT,
            full: false,
        }
    }
}

/// Inventory connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OcmConfig {
    /// API base URL.
    pub url: String,
    /// Bearer token.
    pub token: Option<String>,
}

impl Default for OcmConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OCM_URL.to_string(),
            token: None,
        }
    }
}

/// Issue tracker connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JiraConfig {
    /// Base URL.
    pub url: String,
    /// Personal access token.
    pub token: Option<String>,
    /// Project searched for cluster tickets.
    pub cluster_project: String,
    /// Project searched for support exceptions.
    pub exceptions_project: String,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ISSUE_TRACKER_URL.to_string(),
            token: None,
            cluster_project: DEFAULT_TICKET_PROJECT.to_string(),
            exceptions_project: DEFAULT_EXCEPTIONS_PROJECT.to_string(),
        }
    }
}

/// Alerting connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PagerDutyConfig {
    /// REST API base URL.
    pub api_url: String,
    /// Web UI base URL used for service links.
    pub web_url: String,
    /// API token.
    pub token: Option<String>,
}

impl Default for PagerDutyConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_PAGERDUTY_API_URL.to_string(),
            web_url: DEFAULT_ALERTING_WEB_URL.to_string(),
            token: None,
        }
    }
}

/// Audit trail access.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AwsConfig {
    /// Named profile passed to the AWS CLI.
    pub profile: Option<String>,
    /// Region passed to the AWS CLI.
    pub region: Option<String>,
}

/// Link base URLs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinksConfig {
    /// Audit search base URL.
    pub audit_search_url: String,
    /// Cluster dashboard base URL.
    pub dashboard_url: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            audit_search_url: DEFAULT_AUDIT_SEARCH_URL.to_string(),
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
        }
    }
}

/// Audit classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuditConfig {
    /// Extra noise fragments on top of the built-in set.
    pub extra_noise: Vec<String>,
}

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Report defaults.
    pub context: ContextConfig,
    /// Inventory.
    pub ocm: OcmConfig,
    /// Issue tracker.
    pub jira: JiraConfig,
    /// Alerting.
    pub pagerduty: PagerDutyConfig,
    /// Audit trail.
    pub aws: AwsConfig,
    /// Link base URLs.
    pub links: LinksConfig,
    /// Audit classification.
    pub audit: AuditConfig,
}

impl Config {
    /// Default config file location, if a config directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("clusterctx").join("config.toml"))
    }

    /// Loads `path`, or the default location when `path` is `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CliError::Config(format!(
                "failed to read config file '{}': {e}",
                path.as_ref().display()
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let config: Self =
            toml::from_str(content).map_err(|e| CliError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an invalid-configuration error for the first bad value.
    pub fn validate(&self) -> Result<(), CliError> {
        self.context.output.parse::<OutputEncoding>()?;

        if self.context.days == 0 {
            return Err(CliError::invalid("context.days must be greater than 0"));
        }
        if self.context.full && self.context.pages == 0 {
            return Err(CliError::invalid("context.pages must be greater than 0"));
        }

        for (name, value) in [
            ("ocm.url", &self.ocm.url),
            ("jira.url", &self.jira.url),
            ("pagerduty.api_url", &self.pagerduty.api_url),
            ("pagerduty.web_url", &self.pagerduty.web_url),
            ("links.audit_search_url", &self.links.audit_search_url),
            ("links.dashboard_url", &self.links.dashboard_url),
        ] {
            validate_http_url(name, value)?;
        }

        if self.jira.cluster_project.trim().is_empty() {
            return Err(CliError::invalid("jira.cluster_project cannot be empty"));
        }

        Ok(())
    }

    /// Link builder over the configured base URLs.
    #[must_use]
    pub fn link_builder(&self) -> LinkBuilder {
        LinkBuilder::new()
            .audit_search_url(&self.links.audit_search_url)
            .dashboard_url(&self.links.dashboard_url)
            .issue_tracker_url(&self.jira.url)
            .ticket_project(&self.jira.cluster_project)
            .alerting_web_url(&self.pagerduty.web_url)
    }
}

fn validate_http_url(name: &str, value: &str) -> Result<(), CliError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| CliError::invalid(format!("{name} is not a valid URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CliError::invalid(format!(
            "{name} must start with http:// or https://"
        )));
    }
    Ok(())
}
