//! # ctx-cli
//!
//! The `clusterctx` command-line interface.
//!
//! `clusterctx context <CLUSTER>` gathers a cluster's support status,
//! service logs, tickets, alerts, audit trail and deep links into one
//! report, printed as a compact table, a sectioned report or JSON.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   Collaborators    ┌───────────────┐
//! │ backends │───────────────────►│  ctx-context  │──► ContextSnapshot
//! └──────────┘  (async traits)    │   assembler   │          │
//!   OCM, Jira, PagerDuty, AWS     └───────────────┘          ▼
//!                                                     output / report
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backends;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod report;

pub use cli::{Cli, Commands, ContextArgs};
pub use config::Config;
pub use error::CliError;
pub use output::{OutputEncoding, OutputFormat};
