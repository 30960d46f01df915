//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// clusterctx - everything on-call needs to know about one cluster.
#[derive(Parser, Debug, Clone)]
#[command(name = "clusterctx")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to `<config dir>/clusterctx/config.toml`).
    #[arg(short, long, global = true, env = "CLUSTERCTX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter; overrides `RUST_LOG`.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show the context report for a cluster.
    Context(ContextArgs),
}

/// Arguments for the context command.
#[derive(Args, Debug, Clone, Default)]
pub struct ContextArgs {
    /// Cluster id, external id or name.
    pub cluster: String,

    /// Output format: short, long or json.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Lookback window in days for service logs and alert history.
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Maximum audit trail pages to read.
    #[arg(short, long)]
    pub pages: Option<u32>,

    /// AWS profile used for the audit trail.
    #[arg(long, value_name = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Include the audit trail.
    #[arg(long)]
    pub full: bool,

    /// Show service-log summaries and incident details.
    #[arg(long)]
    pub verbose: bool,

    /// Fail instead of leaving a section empty.
    #[arg(long)]
    pub strict: bool,

    /// Organization for support exceptions.
    #[arg(long, value_name = "ORG")]
    pub org_id: Option<String>,

    /// Alerting service to query (repeatable); skips service discovery.
    #[arg(long = "service-id", value_name = "ID")]
    pub service_ids: Vec<String>,

    /// Include every service-log message.
    #[arg(long)]
    pub all_messages: bool,

    /// Only internal service-log messages.
    #[arg(long)]
    pub internal_only: bool,

    /// Inventory API token.
    #[arg(long, env = "OCM_TOKEN", hide_env_values = true)]
    pub ocm_token: Option<String>,

    /// Issue tracker API token.
    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub jira_token: Option<String>,

    /// Alerting API token.
    #[arg(long, env = "PAGERDUTY_TOKEN", hide_env_values = true)]
    pub pagerduty_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_args(argv: &[&str]) -> ContextArgs {
        let cli = Cli::parse_from(argv);
        match cli.command {
            Commands::Context(args) => args,
        }
    }

    #[test]
    fn cli_parses_context_with_defaults() {
        let args = context_args(&["clusterctx", "context", "mock-cluster-id"]);
        assert_eq!(args.cluster, "mock-cluster-id");
        assert_eq!(args.output, None);
        assert_eq!(args.days, None);
        assert!(!args.full);
        assert!(args.service_ids.is_empty());
    }

    #[test]
    fn cli_parses_short_flags() {
        let args = context_args(&[
            "clusterctx", "context", "c1", "-o", "short", "-d", "7", "-p", "3",
        ]);
        assert_eq!(args.output.as_deref(), Some("short"));
        assert_eq!(args.days, Some(7));
        assert_eq!(args.pages, Some(3));
    }

    #[test]
    fn cli_accepts_any_output_string() {
        // Rejected later with an invalid-configuration error, not by clap.
        let args = context_args(&["clusterctx", "context", "c1", "--output", "xml"]);
        assert_eq!(args.output.as_deref(), Some("xml"));
    }

    #[test]
    fn cli_collects_repeated_service_ids() {
        let args = context_args(&[
            "clusterctx",
            "context",
            "c1",
            "--service-id",
            "PD1",
            "--service-id",
            "PD2",
            "--full",
            "--strict",
        ]);
        assert_eq!(args.service_ids, vec!["PD1", "PD2"]);
        assert!(args.full);
        assert!(args.strict);
    }

    #[test]
    fn cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "clusterctx",
            "context",
            "c1",
            "--config",
            "/tmp/clusterctx.toml",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/clusterctx.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }
}
