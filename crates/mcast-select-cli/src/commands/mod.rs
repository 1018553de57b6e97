//! Command implementations.

pub mod add;
pub mod devices;
pub mod sources;

pub use add::run_add;
pub use devices::run_devices;
pub use sources::run_sources;

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use mcast_select_core::storage::{default_inventory_path, InventoryStore};

use crate::error::CliError;

/// Open the inventory at `path`, or the one in the platform data directory.
pub async fn open_inventory(path: Option<&Path>) -> Result<Arc<InventoryStore>, CliError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_inventory_path().ok_or(CliError::NoInventory)?,
    };

    debug!(path = %path.display(), "opening inventory");
    let store = InventoryStore::load(path).await?;
    Ok(Arc::new(store))
}
