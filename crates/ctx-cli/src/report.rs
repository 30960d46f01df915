//! Text renderings of a [`ContextSnapshot`].
//!
//! Both views only read the snapshot. A section whose collaborator failed
//! prints `data unavailable: <reason>` instead of its content.

use std::io::Write;

use ctx_alerts::HistorySummary;
use ctx_context::{BanStatus, ContextSnapshot, Issue, Section};

use crate::error::CliError;
use crate::output::{DetailOptions, ReportDisplay, write_columns};

/// Ban code that carries a remediation procedure.
pub const EXPORT_CONTROL_BAN_CODE: &str = "export_control_compliance";

const EXPORT_CONTROL_REMEDIATION: &str = "User banned due to export control compliance.\nPlease follow the steps detailed here: https://github.com/openshift/ops-sop/blob/master/v4/alerts/UpgradeConfigSyncFailureOver4HrSRE.md#user-banneddisabled-due-to-export-control-compliance .";

const NOT_AVAILABLE: &str = "n/a";

const BAN_SECTION: &str = "User Ban Details";

/// Writes the ban-status section.
pub fn write_ban_status<W: Write>(writer: &mut W, ban: &BanStatus) -> Result<(), CliError> {
    header(writer, BAN_SECTION)?;
    if !ban.banned {
        writeln!(writer, "User is not banned")?;
        return Ok(());
    }
    writeln!(writer, "User is banned")?;
    writeln!(writer, "Ban code = {}", ban.code)?;
    writeln!(writer, "Ban description = {}", ban.description)?;
    if ban.code == EXPORT_CONTROL_BAN_CODE {
        writeln!(writer, "{EXPORT_CONTROL_REMEDIATION}")?;
    }
    Ok(())
}

fn header<W: Write>(writer: &mut W, title: &str) -> Result<(), CliError> {
    writeln!(writer)?;
    writeln!(writer, ">> {title}")?;
    Ok(())
}

/// Prints the unavailability marker for the first degraded section in
/// `sections`. Returns true when one was printed.
fn unavailable<W: Write>(
    writer: &mut W,
    snapshot: &ContextSnapshot,
    sections: &[Section],
) -> Result<bool, CliError> {
    match sections.iter().find_map(|s| snapshot.unavailable(*s)) {
        Some(gap) => {
            writeln!(writer, "   data unavailable: {}", gap.reason)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn write_issues<W: Write>(writer: &mut W, issues: &[Issue]) -> Result<(), CliError> {
    if issues.is_empty() {
        writeln!(writer, "None")?;
        return Ok(());
    }
    for issue in issues {
        writeln!(
            writer,
            "[{}]({}/{}) [{}]: {}",
            issue.key, issue.issue_type, issue.priority, issue.status, issue.summary
        )?;
        writeln!(writer, "- Link: {}", issue.url)?;
        writeln!(writer)?;
    }
    Ok(())
}

fn count_or_na(snapshot: &ContextSnapshot, sections: &[Section], count: usize) -> String {
    if sections.iter().any(|s| snapshot.unavailable(*s).is_some()) {
        NOT_AVAILABLE.to_string()
    } else {
        count.to_string()
    }
}

impl ReportDisplay for ContextSnapshot {
    fn write_compact<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let days = self.lookback_days;
        let header = vec![
            "Cluster".to_string(),
            "Version".to_string(),
            "Supported?".to_string(),
            format!("SLs (last {days} d)"),
            "Jira Tickets".to_string(),
            "Current Alerts".to_string(),
            format!("Historical Alerts (last {days} d)"),
        ];

        let supported = if self.unavailable(Section::SupportStatus).is_some() {
            NOT_AVAILABLE.to_string()
        } else {
            self.is_supported().to_string()
        };
        let current = if self.unavailable(Section::CurrentAlerts).is_some()
            || self.unavailable(Section::AlertServices).is_some()
        {
            NOT_AVAILABLE.to_string()
        } else {
            self.current_alert_breakdown().to_string()
        };
        let row = vec![
            format!("{} -- {}", self.cluster.name, self.cluster.id),
            self.cluster.version.clone(),
            supported,
            count_or_na(self, &[Section::ServiceLogs], self.service_logs.len()),
            count_or_na(self, &[Section::JiraIssues], self.jira_issues.len()),
            current,
            count_or_na(
                self,
                &[Section::HistoricalAlerts, Section::AlertServices],
                usize::try_from(self.historical_incident_total).unwrap_or(usize::MAX),
            ),
        ];

        write_columns(writer, &[header, row])
    }

    fn write_detailed<W: Write>(
        &self,
        writer: &mut W,
        options: &DetailOptions,
    ) -> Result<(), CliError> {
        let title = format!("{} -- {}", self.cluster.name, self.cluster.id);
        let rule = "=".repeat(title.chars().count());
        writeln!(writer, "{rule}")?;
        writeln!(writer, "{title}")?;
        writeln!(writer, "{rule}")?;
        if !self.cluster.description.is_empty() {
            writeln!(writer, "{}", self.cluster.description)?;
        }

        header(writer, "Cluster Details")?;
        let created = self
            .cluster
            .created_at
            .map_or_else(
                || "unknown".to_string(),
                |t| t.format("%Y-%m-%d %H:%M UTC").to_string(),
            );
        write_columns(
            writer,
            &[
                vec!["Version:".to_string(), self.cluster.version.clone()],
                vec!["External ID:".to_string(), self.cluster.external_id.clone()],
                vec!["Infra ID:".to_string(), self.cluster.infra_id.clone()],
                vec!["Created:".to_string(), created],
                vec!["Topology:".to_string(), self.cluster.topology.to_string()],
                vec!["Environment:".to_string(), self.environment.to_string()],
            ],
        )?;

        // Support status
        header(writer, "Limited Support")?;
        if !unavailable(writer, self, &[Section::SupportStatus])? {
            if self.is_supported() {
                writeln!(writer, "Cluster is fully supported")?;
            }
            for reason in &self.support.limited_support_reasons {
                writeln!(writer, "Summary: {}", reason.summary)?;
                writeln!(writer, "Details: {}", reason.details)?;
            }
        }

        header(
            writer,
            &format!("Service Logs sent in the past {} Days", self.lookback_days),
        )?;
        if !unavailable(writer, self, &[Section::ServiceLogs])? {
            if self.service_logs.is_empty() {
                writeln!(writer, "None")?;
            }
            for entry in &self.service_logs {
                writeln!(
                    writer,
                    "{}: {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M UTC"),
                    entry.description
                )?;
                if options.verbose && !entry.summary.is_empty() {
                    writeln!(writer, "   [{}] {}", entry.severity, entry.summary)?;
                }
            }
        }

        if self.unavailable(Section::SupportStatus).is_none() {
            write_ban_status(writer, &self.support.ban)?;
        } else {
            header(writer, BAN_SECTION)?;
            unavailable(writer, self, &[Section::SupportStatus])?;
        }

        header(writer, "Jira Issues")?;
        if !unavailable(writer, self, &[Section::JiraIssues])? {
            write_issues(writer, &self.jira_issues)?;
        }

        header(writer, "Support Exceptions")?;
        if !unavailable(writer, self, &[Section::SupportExceptions])? {
            write_issues(writer, &self.support_exceptions)?;
        }

        // Alerting
        header(writer, "Current Alerts")?;
        if !unavailable(writer, self, &[Section::AlertServices, Section::CurrentAlerts])? {
            writeln!(writer, "{}", self.current_alert_breakdown())?;
            for id in &self.alert_service_ids {
                writeln!(writer, "Service: {}:", self.alert_service_link(id))?;
                let incidents = self.current_alerts_for(id);
                if incidents.is_empty() {
                    writeln!(writer, "   None")?;
                }
                for incident in incidents {
                    write!(writer, "   [{}] {}", incident.urgency, incident.title)?;
                    if options.verbose {
                        let opened = incident
                            .created_at
                            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                            .unwrap_or_default();
                        write!(writer, " ({}, opened {opened})", incident.status)?;
                    }
                    writeln!(writer)?;
                }
            }
        }

        header(writer, "Historical Alerts")?;
        if !unavailable(writer, self, &[Section::AlertServices, Section::HistoricalAlerts])? {
            let summary = HistorySummary::build(
                &self.alert_service_ids,
                &self.historical_alerts,
                self.lookback_days,
            );
            write!(
                writer,
                "{}",
                summary.write_text(|id| self.alert_service_link(id))
            )?;
        }

        header(writer, "Environment Health Details")?;
        if !unavailable(writer, self, &[Section::EnvironmentHealth])? {
            match &self.environment_health {
                Some(health) => {
                    writeln!(writer, "Tenant URL: {}", health.tenant_url)?;
                    writeln!(writer, "Logs App URL: {}", health.logs_url)?;
                }
                None => writeln!(writer, "None")?,
            }
        }

        if options.audit_trail || self.unavailable(Section::AuditTrail).is_some() {
            header(writer, "Potentially interesting audit events")?;
            if !unavailable(writer, self, &[Section::AuditTrail])? {
                if self.audit_events.is_empty() {
                    writeln!(writer, "None")?;
                } else {
                    let mut rows = vec![vec![
                        "ID".to_string(),
                        "EVENT".to_string(),
                        "ACTOR".to_string(),
                        "TIME".to_string(),
                    ]];
                    rows.extend(self.audit_events.iter().map(|event| {
                        vec![
                            event.id.clone(),
                            event.name.clone(),
                            event.actor_or_empty().to_string(),
                            event.timestamp.to_rfc3339(),
                        ]
                    }));
                    write_columns(writer, &rows)?;
                }
            }
        }

        header(writer, "Other Helpful Links")?;
        writeln!(writer, "Ticket Search: {}", self.links.ticket_search)?;
        writeln!(writer, "Cluster Dashboard: {}", self.links.dashboard)?;
        if let Some(audit) = &self.links.audit_logs {
            writeln!(writer, "Audit Logs: {audit}")?;
        }
        for link in &self.links.alert_services {
            writeln!(writer, "Alerting Service {}: {}", link.service_id, link.url)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputEncoding, OutputFormat};
    use chrono::{TimeZone, Utc};
    use ctx_alerts::{Incident, IncidentOccurrenceTracker, Urgency};
    use ctx_audit::AuditEvent;
    use ctx_context::{
        ClusterIdentity, Collaborator, Environment, HealthDetails, LimitedSupportReason,
        LinkBuilder, ServiceLogEntry, Topology, UnavailableSection,
    };

    fn snapshot() -> ContextSnapshot {
        let cluster = ClusterIdentity {
            id: "mock-cluster-id".into(),
            external_id: "mock-external-id".into(),
            infra_id: "mock-infra-id".into(),
            name: "mock-cluster".into(),
            version: "4.15.3".into(),
            description: "Cluster is ready".into(),
            ..ClusterIdentity::default()
        };
        let ids = vec!["PD12345".to_string()];
        let links = LinkBuilder::default().build(&cluster, &Environment::Production, &ids);
        let when = Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).single().expect("valid date");

        let mut snapshot = ContextSnapshot {
            cluster,
            environment: Environment::Production,
            lookback_days: 7,
            alert_service_ids: ids,
            links,
            ..ContextSnapshot::default()
        };
        snapshot.service_logs.push(ServiceLogEntry {
            timestamp: when,
            description: "Cluster upgraded".into(),
            summary: "Upgrade complete".into(),
            severity: "Info".into(),
        });
        snapshot.jira_issues.push(Issue {
            key: "OHSS-1000".into(),
            summary: "Upgrade stuck".into(),
            issue_type: "Story".into(),
            priority: "Major".into(),
            status: "New".into(),
            url: "https://issues.redhat.com/browse/OHSS-1000".into(),
        });
        snapshot.current_alerts.insert(
            "PD12345".into(),
            vec![
                Incident::new("Q1", "ClusterOperatorDown", Urgency::High),
                Incident::new("Q2", "ClusterOperatorDown", Urgency::High),
                Incident::new("Q3", "KubePersistentVolumeFillingUp", Urgency::Low),
            ],
        );
        snapshot.historical_alerts.insert(
            "PD12345".into(),
            vec![IncidentOccurrenceTracker::new("ClusterOperatorDown", 5, "2024-01-02")],
        );
        snapshot.historical_incident_total = 5;
        snapshot.environment_health = Some(HealthDetails {
            tenant_url: "https://tenant.example.com".into(),
            logs_url: "https://tenant.example.com/logs".into(),
        });
        snapshot
            .audit_events
            .push(AuditEvent::new("evt-1234567890", "DeleteBucket", None, when));
        snapshot
    }

    fn detailed(snapshot: &ContextSnapshot, options: DetailOptions) -> String {
        let mut buf = Vec::new();
        snapshot.write_detailed(&mut buf, &options).expect("write");
        String::from_utf8(buf).expect("utf8")
    }

    fn ban(ban: &BanStatus) -> String {
        let mut buf = Vec::new();
        write_ban_status(&mut buf, ban).expect("write");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn ban_status_not_banned() {
        assert_eq!(ban(&BanStatus::default()), "\n>> User Ban Details\nUser is not banned\n");
    }

    #[test]
    fn ban_status_export_control_adds_remediation() {
        let output = ban(&BanStatus {
            banned: true,
            code: "export_control_compliance".into(),
            description: "Export control".into(),
        });
        assert_eq!(
            output,
            "\n>> User Ban Details\nUser is banned\nBan code = export_control_compliance\nBan description = Export control\nUser banned due to export control compliance.\nPlease follow the steps detailed here: https://github.com/openshift/ops-sop/blob/master/v4/alerts/UpgradeConfigSyncFailureOver4HrSRE.md#user-banneddisabled-due-to-export-control-compliance .\n"
        );
    }

    #[test]
    fn ban_status_other_code_stops_after_description() {
        let output = ban(&BanStatus {
            banned: true,
            code: "other_code".into(),
            description: "Other reason".into(),
        });
        assert_eq!(
            output,
            "\n>> User Ban Details\nUser is banned\nBan code = other_code\nBan description = Other reason\n"
        );
    }

    #[test]
    fn compact_has_header_and_one_row() {
        let output = OutputFormat::new(OutputEncoding::Short)
            .to_string(&snapshot())
            .expect("render");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        for label in [
            "Cluster",
            "Version",
            "Supported?",
            "SLs (last 7 d)",
            "Jira Tickets",
            "Current Alerts",
            "Historical Alerts (last 7 d)",
        ] {
            assert!(lines[0].contains(label), "missing {label}");
        }
        assert!(lines[1].starts_with("mock-cluster -- mock-cluster-id"));
        assert!(lines[1].contains("4.15.3"));
        assert!(lines[1].contains("true"));
        assert!(lines[1].contains("H: 2 | L: 1"));
        assert!(lines[1].trim_end().ends_with('5'));
    }

    #[test]
    fn compact_marks_failed_counts() {
        let mut snapshot = snapshot();
        snapshot.jira_issues.clear();
        snapshot.unavailable.push(UnavailableSection {
            section: Section::JiraIssues,
            collaborator: Collaborator::IssueTracker,
            reason: "401".into(),
        });
        let output = OutputFormat::new(OutputEncoding::Short)
            .to_string(&snapshot)
            .expect("render");
        assert!(output.lines().nth(1).is_some_and(|row| row.contains("n/a")));
    }

    #[test]
    fn detailed_has_banner_and_sections() {
        let output = detailed(&snapshot(), DetailOptions::default());
        assert!(output.starts_with(
            "===============================\nmock-cluster -- mock-cluster-id\n===============================\n"
        ));
        for section in [
            ">> Limited Support",
            ">> Service Logs sent in the past 7 Days",
            ">> User Ban Details",
            ">> Jira Issues",
            ">> Support Exceptions",
            ">> Current Alerts",
            ">> Historical Alerts",
            ">> Environment Health Details",
            ">> Other Helpful Links",
        ] {
            assert!(output.contains(section), "missing {section}");
        }
        assert!(output.contains("- Link: https://issues.redhat.com/browse/OHSS-1000"));
        assert!(output.contains("Tenant URL: https://tenant.example.com"));
        assert!(output.contains("Logs App URL: https://tenant.example.com/logs"));
        assert!(output.contains(
            "Service: https://redhat.pagerduty.com/service-directory/PD12345:"
        ));
        assert!(output.contains("Total number of incidents [ 5 ] in [ 7 ] days"));
        assert!(output.contains("Alerting Service PD12345: https://redhat.pagerduty.com/service-directory/PD12345"));
        assert!(output.contains("Audit Logs: "));
        assert!(output.contains(">> Cluster Details\nVersion:      4.15.3\n"));
        assert!(output.contains("External ID:  mock-external-id\n"));
        assert!(output.contains("Infra ID:     mock-infra-id\n"));
        assert!(output.contains("Created:      unknown\n"));
        assert!(output.contains("Topology:     standalone\n"));
        assert!(output.contains("Environment:  production\n"));
        assert!(!output.contains("Potentially interesting audit events"));
        assert!(!output.contains("Upgrade complete"));
    }

    #[test]
    fn detailed_lists_limited_support_reasons() {
        let mut snapshot = snapshot();
        snapshot.support.limited_support_reasons.push(LimitedSupportReason {
            summary: "Cluster is in limited support".into(),
            details: "Missing IAM role".into(),
        });
        let output = detailed(&snapshot, DetailOptions::default());
        assert!(output.contains("Summary: Cluster is in limited support"));
        assert!(output.contains("Details: Missing IAM role"));
        assert!(!output.contains("Cluster is fully supported"));
    }

    #[test]
    fn detailed_audit_and_verbose() {
        let output = detailed(
            &snapshot(),
            DetailOptions {
                verbose: true,
                audit_trail: true,
            },
        );
        assert!(output.contains(">> Potentially interesting audit events\nID "));
        assert!(output
            .lines()
            .any(|line| line.starts_with("ID ") && line.contains("EVENT")));
        assert!(output.contains("evt-1234567890  DeleteBucket"));
        assert!(output.contains("   [Info] Upgrade complete"));
    }

    #[test]
    fn detailed_shows_creation_time_and_hosted_topology() {
        let mut snapshot = snapshot();
        snapshot.cluster.created_at = Utc.with_ymd_and_hms(2023, 6, 1, 8, 0, 0).single();
        snapshot.cluster.topology = Topology::HostedControlPlane;
        let output = detailed(&snapshot, DetailOptions::default());
        assert!(output.contains("Created:      2023-06-01 08:00 UTC\n"));
        assert!(output.contains("Topology:     hosted_control_plane\n"));
    }

    #[test]
    fn degraded_support_status_keeps_ban_section() {
        let mut snapshot = snapshot();
        snapshot.unavailable.push(UnavailableSection {
            section: Section::SupportStatus,
            collaborator: Collaborator::Inventory,
            reason: "503 Service Unavailable".into(),
        });
        let output = detailed(&snapshot, DetailOptions::default());
        assert!(output.contains(
            ">> User Ban Details\n   data unavailable: 503 Service Unavailable\n"
        ));
        assert!(!output.contains("User is not banned"));
    }

    #[test]
    fn detailed_marks_unavailable_sections() {
        let mut snapshot = snapshot();
        snapshot.jira_issues.clear();
        snapshot.unavailable.push(UnavailableSection {
            section: Section::JiraIssues,
            collaborator: Collaborator::IssueTracker,
            reason: "401 Unauthorized".into(),
        });
        let output = detailed(&snapshot, DetailOptions::default());
        assert!(output.contains(">> Jira Issues\n   data unavailable: 401 Unauthorized\n"));
    }

    #[test]
    fn detailed_omits_audit_link_for_unknown_environment() {
        let mut snapshot = snapshot();
        snapshot.links.audit_logs = None;
        let output = detailed(&snapshot, DetailOptions::default());
        assert!(!output.contains("Audit Logs:"));
    }

    #[test]
    fn json_round_trips() {
        let original = snapshot();
        let output = OutputFormat::new(OutputEncoding::Json)
            .to_string(&original)
            .expect("render");
        let parsed: ContextSnapshot = serde_json::from_str(&output).expect("parse");
        assert_eq!(parsed, original);
        assert!(output.contains("\"alert_service_ids\""));
        assert!(!output.contains(">> "));
    }

    #[test]
    fn rendering_is_deterministic() {
        let snapshot = snapshot();
        assert_eq!(
            detailed(&snapshot, DetailOptions::default()),
            detailed(&snapshot, DetailOptions::default())
        );
    }
}
