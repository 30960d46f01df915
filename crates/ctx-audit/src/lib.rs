//! # ctx-audit
//!
//! Audit-trail event classification for clusterctx.
//!
//! Incident responders reading a cloud audit trail mostly see read-only API
//! calls and automation traffic. This crate narrows a raw event list down to
//! the events worth reading.
//!
//! ## Features
//!
//! - [`AuditEvent`] - One audit-trail entry (id, operation name, actor, time)
//! - [`EventClassifier`] - Noise suppression and automated-actor redaction
//! - [`is_noise_event`] - Shortcut using the default fragment set
//!
//! ## Example
//!
//! ```rust
//! use ctx_audit::{AuditEvent, EventClassifier};
//! use chrono::Utc;
//!
//! let events = vec![
//!     AuditEvent::new("1", "ListBuckets", Some("alice"), Utc::now()),
//!     AuditEvent::new("2", "DeleteBucket", Some("RH-SRE-bot"), Utc::now()),
//! ];
//!
//! let kept = EventClassifier::default().classify(events);
//! assert_eq!(kept.len(), 1);
//! assert_eq!(kept[0].name, "DeleteBucket");
//! assert!(kept[0].actor.is_none());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod events;

// Re-export main types
pub use classifier::{
    ClassificationTally, EventClassifier, NOISE_FRAGMENTS, REDACTED_ACTOR_PREFIX, is_noise_event,
};
pub use events::AuditEvent;
