//! Error types for context assembly.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// External system a snapshot section comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    /// Cluster inventory (identity, support status).
    Inventory,
    /// Issue tracker.
    IssueTracker,
    /// Environment health API.
    EnvironmentHealth,
    /// Service-log store.
    ServiceLogs,
    /// Alerting service.
    Alerting,
    /// Cloud audit trail.
    AuditTrail,
}

impl Collaborator {
    /// Returns the collaborator name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::IssueTracker => "issue_tracker",
            Self::EnvironmentHealth => "environment_health",
            Self::ServiceLogs => "service_logs",
            Self::Alerting => "alerting",
            Self::AuditTrail => "audit_trail",
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure reported by a collaborator implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend could not be reached or refused the request.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with data that does not map onto the snapshot.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Creates an [`Unavailable`](Self::Unavailable) error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Creates a [`Malformed`](Self::Malformed) error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }

    /// Attributes this error to a collaborator.
    #[must_use]
    pub fn attribute(self, collaborator: Collaborator) -> ContextError {
        match self {
            Self::NotFound(reason) | Self::Unavailable(reason) => {
                ContextError::CollaboratorUnavailable {
                    collaborator,
                    reason,
                }
            }
            Self::Malformed(reason) => ContextError::MalformedResponse {
                collaborator,
                reason,
            },
        }
    }
}

/// Errors surfaced by context assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// No cluster matches the requested key. Fatal.
    #[error("cluster not found: {key}")]
    ClusterNotFound {
        /// The key that was looked up.
        key: String,
    },

    /// A collaborator failed. Fatal only for identity resolution or under
    /// [`AssemblyPolicy::Strict`](crate::AssemblyPolicy::Strict).
    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable {
        /// The failing collaborator.
        collaborator: Collaborator,
        /// What went wrong.
        reason: String,
    },

    /// Configuration rejected before any collaborator call.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What was wrong.
        reason: String,
    },

    /// A collaborator returned unusable data.
    #[error("malformed response from {collaborator}: {reason}")]
    MalformedResponse {
        /// The collaborator that answered.
        collaborator: Collaborator,
        /// What could not be mapped.
        reason: String,
    },
}

impl ContextError {
    /// Creates an [`InvalidConfiguration`](Self::InvalidConfiguration) error.
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// The collaborator this error is attributed to, if any.
    #[must_use]
    pub const fn collaborator(&self) -> Option<Collaborator> {
        match self {
            Self::CollaboratorUnavailable { collaborator, .. }
            | Self::MalformedResponse { collaborator, .. } => Some(*collaborator),
            Self::ClusterNotFound { .. } => Some(Collaborator::Inventory),
            Self::InvalidConfiguration { .. } => None,
        }
    }
}

/// Result type for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;
