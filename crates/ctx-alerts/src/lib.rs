//! Alerting incident model and history summarization for clusterctx.
//!
//! `ctx-alerts` holds the alerting side of a cluster report:
//!
//! - [`Incident`]: a currently open incident with its [`Urgency`]
//! - [`IncidentOccurrenceTracker`]: per-incident-type rollup of alert history
//! - [`HistorySummary`]: per-service rows and grand total over a lookback window
//!
//! # Example
//!
//! ```rust
//! use ctx_alerts::{IncidentOccurrenceTracker, summarize};
//! use std::collections::BTreeMap;
//!
//! let mut history = BTreeMap::new();
//! history.insert(
//!     "PD12345".to_string(),
//!     vec![
//!         IncidentOccurrenceTracker::new("Network Outage", 3, "2024-02-22"),
//!         IncidentOccurrenceTracker::new("Service Downtime", 2, "2024-02-20"),
//!     ],
//! );
//!
//! let (text, total) = summarize(&["PD12345".to_string()], &history, 7);
//! assert_eq!(total, 5);
//! assert!(text.contains("Total number of incidents [ 5 ] in [ 7 ] days"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod history;
pub mod types;

// Re-export main types at crate root
pub use history::{HistorySummary, ServiceHistory, summarize};
pub use types::{Incident, IncidentOccurrenceTracker, Urgency, UrgencyBreakdown};
