//! Noise suppression and actor redaction for audit-trail events.
//!
//! Matching is a case-sensitive substring test against the operation name.
//! Anything that does not match stays in the report: the classifier is a
//! precision filter and fails open.

use tracing::trace;

use crate::events::AuditEvent;

/// Operation-name fragments that mark read-only or routine key operations.
pub const NOISE_FRAGMENTS: &[&str] = &[
    "Get",
    "List",
    "Describe",
    "AssumeRole",
    "Encrypt",
    "Decrypt",
    "LookupEvents",
    "GenerateDataKey",
];

/// Actor prefix used by automated service accounts.
pub const REDACTED_ACTOR_PREFIX: &str = "RH-SRE-";

/// Returns true if `event_name` matches one of the default [`NOISE_FRAGMENTS`].
#[must_use]
pub fn is_noise_event(event_name: &str) -> bool {
    NOISE_FRAGMENTS
        .iter()
        .any(|fragment| event_name.contains(fragment))
}

/// Counts produced by a single [`EventClassifier::classify`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationTally {
    /// Events kept in the output.
    pub retained: usize,
    /// Events dropped as noise.
    pub suppressed: usize,
    /// Retained events whose actor was cleared.
    pub redacted: usize,
}

/// Audit event classifier.
///
/// The default fragment set is always active; configuration may only add to it.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    extra_fragments: Vec<String>,
    actor_prefix: String,
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self {
            extra_fragments: Vec::new(),
            actor_prefix: REDACTED_ACTOR_PREFIX.to_string(),
        }
    }
}

impl EventClassifier {
    /// Creates a classifier with the default fragment set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds fragments on top of [`NOISE_FRAGMENTS`]. Empty strings are ignored,
    /// since they would match every event.
    #[must_use]
    pub fn with_extra_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_fragments.extend(
            fragments
                .into_iter()
                .map(Into::into)
                .filter(|f| !f.is_empty()),
        );
        self
    }

    /// Returns true if the event name is operationally uninteresting.
    #[must_use]
    pub fn is_noise_event(&self, event_name: &str) -> bool {
        is_noise_event(event_name)
            || self
                .extra_fragments
                .iter()
                .any(|fragment| event_name.contains(fragment.as_str()))
    }

    fn is_automated_actor(&self, actor: &str) -> bool {
        actor.starts_with(&self.actor_prefix)
    }

    /// Drops noise events and redacts automated actors, preserving order.
    #[must_use]
    pub fn classify<I>(&self, events: I) -> Vec<AuditEvent>
    where
        I: IntoIterator<Item = AuditEvent>,
    {
        self.classify_with_tally(events).0
    }

    /// Like [`classify`](Self::classify) but also returns the counts.
    #[must_use]
    pub fn classify_with_tally<I>(&self, events: I) -> (Vec<AuditEvent>, ClassificationTally)
    where
        I: IntoIterator<Item = AuditEvent>,
    {
        let mut tally = ClassificationTally::default();
        let kept: Vec<AuditEvent> = events
            .into_iter()
            .filter_map(|mut event| {
                if self.is_noise_event(&event.name) {
                    tally.suppressed += 1;
                    return None;
                }
                if event
                    .actor
                    .as_deref()
                    .is_some_and(|actor| self.is_automated_actor(actor))
                {
                    event.actor = None;
                    tally.redacted += 1;
                }
                tally.retained += 1;
                Some(event)
            })
            .collect();

        trace!(
            retained = tally.retained,
            suppressed = tally.suppressed,
            redacted = tally.redacted,
            "classified audit events"
        );
        (kept, tally)
    }
}
