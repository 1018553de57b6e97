//! Table-formatted output for CLI.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use mcast_select_core::selection::{LoadedPage, Membership, Submission};
use mcast_select_core::types::{Application, Device, DeviceId, MulticastGroup};

use super::OutputFormatter;

pub struct TableOutput;

impl TableOutput {
    pub fn new() -> Self {
        Self
    }

    fn membership_cell(membership: Membership) -> Cell {
        match membership {
            Membership::Joined => Cell::new("joined").fg(Color::Green),
            Membership::NotJoined => Cell::new("-"),
            Membership::Unknown => Cell::new("?").fg(Color::Yellow),
        }
    }

    fn checkbox(checked: bool, disabled: bool) -> &'static str {
        match (checked, disabled) {
            (_, true) => "[x]",
            (true, false) => "[*]",
            (false, false) => "[ ]",
        }
    }

    fn last_seen(at: Option<DateTime<Utc>>) -> String {
        let Some(at) = at else {
            return "never".to_string();
        };

        let elapsed = Utc::now().signed_duration_since(at);
        if elapsed.num_days() > 0 {
            format!("{}d ago", elapsed.num_days())
        } else if elapsed.num_hours() > 0 {
            format!("{}h ago", elapsed.num_hours())
        } else if elapsed.num_minutes() > 0 {
            format!("{}m ago", elapsed.num_minutes())
        } else {
            "just now".to_string()
        }
    }
}

impl Default for TableOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TableOutput {
    fn format_sources(&self, group: &MulticastGroup, sources: &[Application]) -> String {
        if sources.is_empty() {
            return format!(
                "No applications share service profile {} with group {}.",
                group.service_profile_id, group.id
            );
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["ID", "Name", "Service Profile"]);

        for app in sources {
            table.add_row(vec![
                Cell::new(app.id),
                Cell::new(&app.name),
                Cell::new(&app.service_profile_id),
            ]);
        }

        format!(
            "Sources for group {} ({})\n{}\n\nFound {} application(s)",
            group.name,
            group.id,
            table,
            sources.len()
        )
    }

    fn format_page(&self, source: &Application, page: &LoadedPage, page_number: usize) -> String {
        if page.devices.is_empty() {
            return format!("No devices found in application {}.", source.name);
        }

        let by_id: HashMap<&DeviceId, &Device> =
            page.devices.iter().map(|d| (&d.dev_eui, d)).collect();

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["", "DevEUI", "Name", "Profile", "Last Seen", "Group"]);

        for row in &page.refresh.rows {
            let device = by_id.get(&row.device);
            table.add_row(vec![
                Cell::new(Self::checkbox(row.checked, row.disabled)),
                Cell::new(&row.device),
                Cell::new(device.map(|d| d.name.as_str()).unwrap_or("")),
                Cell::new(device.map(|d| d.device_profile_name.as_str()).unwrap_or("")),
                Cell::new(Self::last_seen(device.and_then(|d| d.last_seen_at))),
                Self::membership_cell(row.membership),
            ]);
        }

        let mut output = format!(
            "{}\n\nPage {} of {}: {} of {} device(s)",
            table,
            page_number + 1,
            source.name,
            page.devices.len(),
            page.total_count
        );

        if !page.refresh.failures.is_empty() {
            output.push_str(&format!(
                "\n{} membership lookup(s) failed; shown as '?'",
                page.refresh.failures.len().to_string().yellow()
            ));
        }

        output
    }

    fn format_submission(&self, submission: &Submission, dry_run: bool) -> String {
        let status = if dry_run {
            "[DRY RUN]".yellow()
        } else {
            "[OK]".green()
        };

        match submission {
            Submission::AddDevices { group, devices } => {
                let mut lines = vec![format!(
                    "{} Add {} device(s) to group {}",
                    status,
                    devices.len(),
                    group
                )];
                lines.extend(devices.iter().map(|d| format!("  - {}", d)));
                lines.join("\n")
            }
            Submission::AddSourceDevices {
                group,
                application,
                exceptions,
            } => {
                let mut lines = vec![format!(
                    "{} Add all devices of application {} to group {}",
                    status, application, group
                )];
                if !exceptions.is_empty() {
                    lines.push(format!("  except {} device(s):", exceptions.len()));
                    lines.extend(exceptions.iter().map(|d| format!("  - {}", d)));
                }
                lines.join("\n")
            }
        }
    }

    fn format_error(&self, error: &str) -> String {
        format!("{} {}", "Error:".red(), error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;
    use mcast_select_core::types::{GroupId, SourceId};

    #[test]
    fn test_format_page_marks_rows() {
        colored::control::set_override(false);
        let output = TableOutput::new().format_page(&fixtures::application(), &fixtures::page(), 0);

        assert!(output.contains("[x]"));
        assert!(output.contains("[ ]"));
        assert!(output.contains("lamp-1"));
        assert!(output.contains("Page 1 of street-lights: 2 of 5 device(s)"));
    }

    #[test]
    fn test_format_forwarded_submission() {
        colored::control::set_override(false);
        let submission = Submission::AddSourceDevices {
            group: GroupId::from("g1"),
            application: SourceId(7),
            exceptions: vec![DeviceId::from("0000000000000002")],
        };

        let output = TableOutput::new().format_submission(&submission, true);
        assert!(output.starts_with("[DRY RUN] Add all devices of application 7 to group g1"));
        assert!(output.contains("except 1 device(s)"));
    }

    #[test]
    fn test_last_seen() {
        assert_eq!(TableOutput::last_seen(None), "never");
        let two_hours = Utc::now() - chrono::Duration::minutes(125);
        assert_eq!(TableOutput::last_seen(Some(two_hours)), "2h ago");
    }
}
