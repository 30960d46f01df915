//! Audit-trail event type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single audit-trail entry as reported by the audit collaborator.
///
/// The same shape is used before and after classification; the classifier
/// only drops events or clears [`actor`](Self::actor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Backend-assigned event identifier.
    pub id: String,
    /// API operation name (e.g. `DeleteBucket`).
    pub name: String,
    /// Identity that performed the call, if known.
    #[serde(default)]
    pub actor: Option<String>,
    /// When the call was made.
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        actor: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            actor: actor.map(str::to_string),
            timestamp,
        }
    }

    /// Returns the actor, or `""` when absent or redacted.
    #[must_use]
    pub fn actor_or_empty(&self) -> &str {
        self.actor.as_deref().unwrap_or("")
    }
}
