//! Show one page of a source with membership status.

use std::path::Path;

use mcast_select_core::types::{GroupId, SourceId};
use mcast_select_core::{SelectionController, SessionOptions};

use crate::cli::DevicesArgs;
use crate::commands::open_inventory;
use crate::error::CliError;
use crate::output::get_formatter;

/// Run the devices command
pub async fn run_devices(
    args: DevicesArgs,
    inventory: Option<&Path>,
    concurrency: usize,
    json: bool,
) -> Result<(), CliError> {
    let formatter = get_formatter(json);
    let store = open_inventory(inventory).await?;

    let options = SessionOptions {
        lookup_concurrency: concurrency,
        page_size: args.page_size,
        ..SessionOptions::default()
    };
    let mut controller = SelectionController::new(store.clone(), GroupId::new(args.group), options);

    let source = controller
        .choose_eligible_source(store.as_ref(), SourceId(args.source))
        .await?;
    let page = controller
        .load_page(store.as_ref(), args.page, args.search.as_deref())
        .await?;

    println!("{}", formatter.format_page(&source, &page, args.page));
    Ok(())
}
