//! File-backed storage.

pub mod inventory;

pub use inventory::{parse_dev_eui, Inventory, InventoryStore};

/// File name of the inventory inside the data directory.
pub const INVENTORY_FILE: &str = "inventory.json";

/// Get the default data directory for mcast-select.
///
/// Uses the `directories` crate to find the appropriate platform-specific
/// data directory.
pub fn default_data_dir() -> Option<std::path::PathBuf> {
    directories::ProjectDirs::from("", "mcast-select", "mcast-select")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Default location of the inventory file.
pub fn default_inventory_path() -> Option<std::path::PathBuf> {
    default_data_dir().map(|dir| dir.join(INVENTORY_FILE))
}
