//! Core alerting types.
//!
//! - [`Urgency`]: how urgently an incident pages
//! - [`Incident`]: a current (open) incident on an alerting service
//! - [`IncidentOccurrenceTracker`]: historical rollup per incident type
//! - [`UrgencyBreakdown`]: high/low bucketing of a set of incidents

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Date format used for [`IncidentOccurrenceTracker::last_occurrence`].
pub const OCCURRENCE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Urgency of an incident as reported by the alerting service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Pages immediately.
    High,
    /// Notifies without paging.
    Low,
    /// Any urgency value the alerting service reports that we do not model.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Urgency {
    /// Returns the urgency as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }

    /// Parses an urgency string, mapping unrecognized values to [`Urgency::Unknown`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An incident on an alerting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    /// Alerting-service incident id.
    pub id: String,
    /// Deduplication key, when the integration sets one.
    #[serde(default)]
    pub incident_key: Option<String>,
    /// Incident title.
    pub title: String,
    /// Urgency.
    #[serde(default)]
    pub urgency: Urgency,
    /// Status (`triggered`, `acknowledged`, `resolved`).
    #[serde(default)]
    pub status: String,
    /// When the incident was opened.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Web page for the incident.
    #[serde(default)]
    pub html_url: Option<String>,
}

impl Incident {
    /// Creates an incident with only id, title and urgency set.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, urgency: Urgency) -> Self {
        Self {
            id: id.into(),
            incident_key: None,
            title: title.into(),
            urgency,
            status: String::new(),
            created_at: None,
            html_url: None,
        }
    }
}

/// Rollup of one incident type within a service's alerting history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentOccurrenceTracker {
    /// Incident type (title).
    pub incident_name: String,
    /// Number of occurrences in the window.
    pub count: u64,
    /// Most recent occurrence, `YYYY-MM-DD`.
    pub last_occurrence: String,
}

impl IncidentOccurrenceTracker {
    /// Creates a tracker.
    #[must_use]
    pub fn new(
        incident_name: impl Into<String>,
        count: u64,
        last_occurrence: impl Into<String>,
    ) -> Self {
        Self {
            incident_name: incident_name.into(),
            count,
            last_occurrence: last_occurrence.into(),
        }
    }

    /// Groups historical incidents by title.
    ///
    /// Result is ordered by count descending, then name ascending. An incident
    /// without a creation time still counts but does not move the last
    /// occurrence.
    #[must_use]
    pub fn tally<'a, I>(incidents: I) -> Vec<Self>
    where
        I: IntoIterator<Item = &'a Incident>,
    {
        let mut groups: BTreeMap<&str, (u64, Option<DateTime<Utc>>)> = BTreeMap::new();
        for incident in incidents {
            let entry = groups.entry(incident.title.as_str()).or_insert((0, None));
            entry.0 += 1;
            if let Some(created) = incident.created_at {
                entry.1 = Some(entry.1.map_or(created, |seen| seen.max(created)));
            }
        }

        let mut trackers: Vec<Self> = groups
            .into_iter()
            .map(|(name, (count, last))| Self {
                incident_name: name.to_string(),
                count,
                last_occurrence: last
                    .map(|t| t.format(OCCURRENCE_DATE_FORMAT).to_string())
                    .unwrap_or_default(),
            })
            .collect();
        // Stable sort keeps the BTreeMap's name order among equal counts.
        trackers.sort_by(|a, b| b.count.cmp(&a.count));
        trackers
    }
}

/// High/low bucketing of incidents by urgency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UrgencyBreakdown {
    /// High-urgency incidents.
    pub high: usize,
    /// Low-urgency incidents.
    pub low: usize,
    /// Incidents with an unrecognized urgency.
    pub unknown: usize,
}

impl UrgencyBreakdown {
    /// Buckets the given incidents.
    #[must_use]
    pub fn from_incidents<'a, I>(incidents: I) -> Self
    where
        I: IntoIterator<Item = &'a Incident>,
    {
        incidents
            .into_iter()
            .fold(Self::default(), |mut acc, incident| {
                match incident.urgency {
                    Urgency::High => acc.high += 1,
                    Urgency::Low => acc.low += 1,
                    Urgency::Unknown => acc.unknown += 1,
                }
                acc
            })
    }

    /// Total incidents counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.high + self.low + self.unknown
    }
}

impl fmt::Display for UrgencyBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H: {} | L: {}", self.high, self.low)
    }
}
