//! Output formatting for CLI results.

pub mod json;
pub mod table;

pub use json::JsonOutput;
pub use table::TableOutput;

use mcast_select_core::selection::{LoadedPage, Submission};
use mcast_select_core::types::{Application, MulticastGroup};

/// Output formatter trait
pub trait OutputFormatter {
    /// Format the applications that can feed a group
    fn format_sources(&self, group: &MulticastGroup, sources: &[Application]) -> String;

    /// Format one page of devices with their membership rows
    fn format_page(&self, source: &Application, page: &LoadedPage, page_number: usize) -> String;

    /// Format a submitted (or planned) group mutation
    fn format_submission(&self, submission: &Submission, dry_run: bool) -> String;

    /// Format an error
    fn format_error(&self, error: &str) -> String;
}

/// Get the appropriate formatter based on JSON flag
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonOutput::new())
    } else {
        Box::new(TableOutput::new())
    }
}
