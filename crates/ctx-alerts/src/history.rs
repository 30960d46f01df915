//! Incident history summarization.
//!
//! Services are always visited in the caller's order, never in map order,
//! so the output is reproducible across runs.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::types::IncidentOccurrenceTracker;

/// History of one alerting service within the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHistory {
    /// Alerting service id.
    pub service_id: String,
    /// One row per incident type; empty when the service had no incidents.
    pub rows: Vec<IncidentOccurrenceTracker>,
}

impl ServiceHistory {
    /// Sum of row counts.
    #[must_use]
    pub fn subtotal(&self) -> u64 {
        self.rows.iter().map(|row| row.count).sum()
    }
}

/// Summary of alerting history across services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    /// Services in caller order.
    pub services: Vec<ServiceHistory>,
    /// Sum of all counts across services and incident types.
    pub total: u64,
    /// Lookback window the history was fetched for.
    pub window_days: u32,
}

impl HistorySummary {
    /// Builds the summary for `service_ids` in order.
    ///
    /// A service absent from `incidents_by_service` is listed with no rows.
    #[must_use]
    pub fn build(
        service_ids: &[String],
        incidents_by_service: &BTreeMap<String, Vec<IncidentOccurrenceTracker>>,
        window_days: u32,
    ) -> Self {
        let services: Vec<ServiceHistory> = service_ids
            .iter()
            .map(|id| ServiceHistory {
                service_id: id.clone(),
                rows: incidents_by_service.get(id).cloned().unwrap_or_default(),
            })
            .collect();
        let total = services.iter().map(ServiceHistory::subtotal).sum();

        Self {
            services,
            total,
            window_days,
        }
    }

    /// Renders the summary as text.
    ///
    /// `service_label` turns a service id into the line printed above its rows
    /// (the detailed report passes the service's web link).
    #[must_use]
    pub fn write_text<F>(&self, service_label: F) -> String
    where
        F: Fn(&str) -> String,
    {
        let mut out = String::new();
        for service in &self.services {
            let _ = writeln!(out, "Service: {}:", service_label(&service.service_id));
            let width = service
                .rows
                .iter()
                .map(|row| row.incident_name.len())
                .max()
                .unwrap_or(0)
                .max("Type".len());
            let _ = writeln!(out, "   {:<width$}  {:>5}  Last Occurrence", "Type", "Count");
            for row in &service.rows {
                let _ = writeln!(
                    out,
                    "   {:<width$}  {:>5}  {}",
                    row.incident_name, row.count, row.last_occurrence
                );
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(
            out,
            "Total number of incidents [ {} ] in [ {} ] days",
            self.total, self.window_days
        );
        out
    }
}

/// Summarizes alerting history, returning the rendered text and grand total.
///
/// Services are labelled by their bare id.
#[must_use]
pub fn summarize(
    service_ids: &[String],
    incidents_by_service: &BTreeMap<String, Vec<IncidentOccurrenceTracker>>,
    window_days: u32,
) -> (String, u64) {
    let summary = HistorySummary::build(service_ids, incidents_by_service, window_days);
    (summary.write_text(str::to_string), summary.total)
}
