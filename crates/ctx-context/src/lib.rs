//! Cluster context assembly for clusterctx.
//!
//! `ctx-context` gathers everything an on-call engineer needs about one
//! cluster into a single [`ContextSnapshot`]: identity and support state,
//! service logs, tickets, alerting history, audit trail and deep links.
//!
//! # Features
//!
//! - **Collaborator traits**: one async trait per external system, see [`sources`]
//! - **Concurrent fan-out**: every section after identity is fetched at once
//! - **Partial failure**: a failing collaborator empties its section and is
//!   recorded in [`ContextSnapshot::unavailable`]
//! - **Strict mode**: [`AssemblyPolicy::Strict`] turns any failure into an error
//! - **Deep links**: audit search, ticket search, dashboard and alert services
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ctx_context::{Collaborators, ContextAssembler, ContextRequest};
//! use ctx_context::testing::FakeBackend;
//!
//! let backend = Arc::new(FakeBackend::populated());
//! let assembler = ContextAssembler::new(Collaborators::shared(backend));
//! let snapshot = assembler
//!     .assemble(&ContextRequest::new("mock-cluster-id").lookback_days(7))
//!     .await?;
//! assert!(snapshot.unavailable.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assembler;
pub mod error;
pub mod links;
pub mod snapshot;
pub mod sources;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types
pub use assembler::{
    AssemblyPolicy, ContextAssembler, ContextRequest, DEFAULT_AUDIT_PAGE_LIMIT,
    DEFAULT_LOOKBACK_DAYS,
};
pub use error::{Collaborator, ContextError, Result, SourceError};
pub use links::LinkBuilder;
pub use snapshot::{
    BanStatus, ClusterIdentity, ContextSnapshot, DiagnosticLinks, Environment, HealthDetails,
    Issue, LimitedSupportReason, Section, ServiceLink, ServiceLogEntry, SupportStatus, Topology,
    UnavailableSection,
};
pub use sources::{
    AlertFetcher, AuditTrailFetcher, ClusterFetcher, Collaborators, EnvironmentHealthFetcher,
    JiraIssueFetcher, ServiceLogFetcher, SourceResult,
};
