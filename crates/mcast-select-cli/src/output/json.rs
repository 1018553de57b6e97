//! JSON-formatted output for CLI.

use serde::Serialize;
use serde_json::{json, Value};

use mcast_select_core::selection::{LoadedPage, Submission};
use mcast_select_core::types::{Application, MulticastGroup};

use super::OutputFormatter;

pub struct JsonOutput;

impl JsonOutput {
    pub fn new() -> Self {
        Self
    }

    fn to_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonOutput {
    fn format_sources(&self, group: &MulticastGroup, sources: &[Application]) -> String {
        Self::to_json(&json!({
            "group": group,
            "sources": sources,
            "count": sources.len()
        }))
    }

    fn format_page(&self, source: &Application, page: &LoadedPage, page_number: usize) -> String {
        let failures: Vec<String> = page.refresh.failures.iter().map(|e| e.to_string()).collect();

        Self::to_json(&json!({
            "application": source,
            "page": page_number,
            "totalCount": page.total_count,
            "devices": page.devices,
            "rows": page.refresh.rows,
            "selectAll": page.refresh.select_all,
            "failures": failures
        }))
    }

    fn format_submission(&self, submission: &Submission, dry_run: bool) -> String {
        let mut output = serde_json::to_value(submission).unwrap_or(json!({}));
        if let Value::Object(ref mut map) = output {
            map.insert("dryRun".to_string(), json!(dry_run));
        }
        Self::to_json(&output)
    }

    fn format_error(&self, error: &str) -> String {
        Self::to_json(&json!({ "error": error }))
    }
}
