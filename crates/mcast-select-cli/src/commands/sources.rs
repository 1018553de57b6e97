//! List the applications a group can take devices from.

use std::path::Path;

use mcast_select_core::service::{eligible_sources, ApplicationDirectory};
use mcast_select_core::types::GroupId;

use crate::cli::SourcesArgs;
use crate::commands::open_inventory;
use crate::error::CliError;
use crate::output::get_formatter;

/// Run the sources command
pub async fn run_sources(
    args: SourcesArgs,
    inventory: Option<&Path>,
    json: bool,
) -> Result<(), CliError> {
    let formatter = get_formatter(json);
    let store = open_inventory(inventory).await?;

    let group = store.get_group(&GroupId::new(args.group)).await?;
    let applications = store.list_applications(args.search.as_deref()).await?;
    let sources = eligible_sources(applications, &group);

    println!("{}", formatter.format_sources(&group, &sources));
    Ok(())
}
