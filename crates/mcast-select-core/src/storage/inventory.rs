//! Inventory file service.
//!
//! A JSON snapshot of applications, devices, multicast groups and group
//! memberships. It backs every collaborator trait so the selection flow can
//! run against a local file. Adding devices to a group is checked the way the
//! application server checks it: the device must exist, share the group's
//! service profile, and have a free multicast slot.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{ServiceError, StorageError};
use crate::service::{ApplicationDirectory, DeviceDirectory, MembershipService, MulticastGroupService};
use crate::types::{
    Application, Device, DeviceFilter, DeviceId, DevicePage, GroupId, MemberFilter,
    MulticastGroup, SourceId,
};

/// Multicast slots a device has; it cannot belong to more groups than this.
pub const MAX_GROUPS_PER_DEVICE: usize = 4;

/// A DevEUI is 8 bytes written as hex.
const DEV_EUI_PATTERN: &str = r"^[0-9a-fA-F]{16}$";

fn dev_eui_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(DEV_EUI_PATTERN).expect("DevEUI pattern is valid"))
}

/// Validate a DevEUI and normalize it to lowercase.
pub fn parse_dev_eui(s: &str) -> Result<DeviceId, StorageError> {
    let s = s.trim();
    if !dev_eui_regex().is_match(s) {
        return Err(StorageError::InvalidDevEui(s.to_string()));
    }
    Ok(DeviceId::new(s.to_ascii_lowercase()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Inventory {
    pub applications: Vec<Application>,
    pub devices: Vec<Device>,
    pub multicast_groups: Vec<MulticastGroup>,
    /// Group id to member DevEUIs.
    pub memberships: BTreeMap<GroupId, BTreeSet<DeviceId>>,
}

impl Inventory {
    /// Validate every DevEUI and store it lowercase.
    fn normalize(&mut self) -> Result<(), StorageError> {
        for device in &mut self.devices {
            device.dev_eui = parse_dev_eui(device.dev_eui.as_str())?;
        }
        for members in self.memberships.values_mut() {
            *members = members
                .iter()
                .map(|id| parse_dev_eui(id.as_str()))
                .collect::<Result<_, _>>()?;
        }
        Ok(())
    }

    fn group(&self, id: &GroupId) -> Result<&MulticastGroup, ServiceError> {
        self.multicast_groups
            .iter()
            .find(|g| &g.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("multicast group {}", id)))
    }

    fn application(&self, id: SourceId) -> Result<&Application, ServiceError> {
        self.applications
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("application {}", id)))
    }

    /// Add `ids` to `group`, all or nothing. Returns how many were new members.
    fn enroll(&mut self, group: &GroupId, ids: &[DeviceId]) -> Result<usize, ServiceError> {
        let profile = self.group(group)?.service_profile_id.clone();
        let ids: Vec<DeviceId> = ids
            .iter()
            .map(|id| DeviceId::new(id.as_str().to_ascii_lowercase()))
            .collect();

        for id in &ids {
            let device = self
                .devices
                .iter()
                .find(|d| &d.dev_eui == id)
                .ok_or_else(|| ServiceError::NotFound(format!("device {}", id)))?;

            if self.application(device.application_id)?.service_profile_id != profile {
                return Err(ServiceError::ServiceProfileMismatch {
                    device: id.clone(),
                    group: group.clone(),
                });
            }

            if self.memberships.get(group).is_some_and(|m| m.contains(id)) {
                continue;
            }
            let joined = self.memberships.values().filter(|m| m.contains(id)).count();
            if joined >= MAX_GROUPS_PER_DEVICE {
                return Err(ServiceError::GroupLimitReached {
                    device: id.clone(),
                    limit: MAX_GROUPS_PER_DEVICE,
                });
            }
        }

        let members = self.memberships.entry(group.clone()).or_default();
        Ok(ids.into_iter().filter(|id| members.insert(id.clone())).count())
    }
}

fn matches_search(haystack: &str, search: &str) -> bool {
    haystack.to_lowercase().contains(&search.to_lowercase())
}

/// Inventory service.
///
/// Takes the file path in the constructor; mutations are written back to it.
#[derive(Debug)]
pub struct InventoryStore {
    path: PathBuf,
    inventory: RwLock<Inventory>,
}

impl InventoryStore {
    /// Load the inventory stored at `path`.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        if !path.exists() {
            return Err(StorageError::NotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(&path).await.map_err(StorageError::Io)?;
        let mut inventory: Inventory =
            serde_json::from_str(&content).map_err(StorageError::Serialization)?;
        inventory.normalize()?;

        debug!(
            path = %path.display(),
            devices = inventory.devices.len(),
            groups = inventory.multicast_groups.len(),
            "inventory loaded"
        );

        Ok(Self {
            path,
            inventory: RwLock::new(inventory),
        })
    }

    /// Write `inventory` to `path` and serve it.
    pub async fn create(path: impl Into<PathBuf>, mut inventory: Inventory) -> Result<Self, StorageError> {
        inventory.normalize()?;
        let store = Self {
            path: path.into(),
            inventory: RwLock::new(inventory),
        };
        store.save().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> Inventory {
        self.inventory.read().await.clone()
    }

    /// Persist the current inventory.
    pub async fn save(&self) -> Result<(), StorageError> {
        let inventory = self.inventory.read().await;
        write_inventory(&self.path, &inventory).await
    }

    pub async fn members(&self, group: &GroupId) -> BTreeSet<DeviceId> {
        self.inventory
            .read()
            .await
            .memberships
            .get(group)
            .cloned()
            .unwrap_or_default()
    }

    async fn enroll_and_save(&self, group: &GroupId, ids: &[DeviceId]) -> Result<usize, ServiceError> {
        let mut inventory = self.inventory.write().await;
        let before = inventory.memberships.get(group).cloned();
        let added = inventory.enroll(group, ids)?;

        if let Err(e) = write_inventory(&self.path, &inventory).await {
            // Keep memory and disk in step.
            match before {
                Some(members) => {
                    inventory.memberships.insert(group.clone(), members);
                }
                None => {
                    inventory.memberships.remove(group);
                }
            }
            return Err(ServiceError::SubmitFailed {
                group: group.clone(),
                message: e.to_string(),
            });
        }

        info!(group = %group, requested = ids.len(), added, "devices enrolled");
        Ok(added)
    }
}

async fn write_inventory(path: &Path, inventory: &Inventory) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::DirectoryAccess(format!("{}: {}", parent.display(), e)))?;
    }

    let content = serde_json::to_string_pretty(inventory).map_err(StorageError::Serialization)?;
    fs::write(path, content).await.map_err(StorageError::Io)?;

    Ok(())
}

impl DeviceDirectory for InventoryStore {
    async fn list_devices(&self, filter: &DeviceFilter) -> Result<DevicePage, ServiceError> {
        let inventory = self.inventory.read().await;
        inventory.application(filter.source)?;

        let mut matching: Vec<&Device> = inventory
            .devices
            .iter()
            .filter(|d| d.application_id == filter.source)
            .filter(|d| match filter.search.as_deref() {
                Some(search) => {
                    matches_search(&d.name, search) || matches_search(d.dev_eui.as_str(), search)
                }
                None => true,
            })
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.dev_eui.cmp(&b.dev_eui)));

        Ok(DevicePage {
            total_count: matching.len(),
            devices: matching
                .into_iter()
                .skip(filter.offset)
                .take(filter.limit)
                .cloned()
                .collect(),
        })
    }
}

impl MembershipService for InventoryStore {
    async fn count_members(&self, filter: &MemberFilter) -> Result<u64, ServiceError> {
        let inventory = self.inventory.read().await;
        inventory.group(&filter.group)?;

        let count = inventory
            .memberships
            .get(&filter.group)
            .map(|members| {
                members
                    .iter()
                    .filter(|id| match filter.search.as_deref() {
                        Some(search) => matches_search(id.as_str(), search),
                        None => true,
                    })
                    .count()
            })
            .unwrap_or(0);

        Ok(count as u64)
    }
}

impl MulticastGroupService for InventoryStore {
    async fn add_devices(&self, group: &GroupId, devices: &[DeviceId]) -> Result<(), ServiceError> {
        self.enroll_and_save(group, devices).await.map(|_| ())
    }

    async fn add_source_devices(
        &self,
        group: &GroupId,
        source: SourceId,
        exceptions: &[DeviceId],
    ) -> Result<(), ServiceError> {
        let ids: Vec<DeviceId> = {
            let inventory = self.inventory.read().await;
            inventory.application(source)?;
            let members = inventory.memberships.get(group);

            inventory
                .devices
                .iter()
                .filter(|d| d.application_id == source)
                .map(|d| d.dev_eui.clone())
                .filter(|id| !exceptions.contains(id))
                .filter(|id| members.map_or(true, |m| !m.contains(id)))
                .collect()
        };

        self.enroll_and_save(group, &ids).await.map(|_| ())
    }
}

impl ApplicationDirectory for InventoryStore {
    async fn list_applications(&self, search: Option<&str>) -> Result<Vec<Application>, ServiceError> {
        let inventory = self.inventory.read().await;
        let mut applications: Vec<Application> = inventory
            .applications
            .iter()
            .filter(|a| search.map_or(true, |s| matches_search(&a.name, s)))
            .cloned()
            .collect();
        applications.sort_by_key(|a| a.id);
        Ok(applications)
    }

    async fn get_group(&self, group: &GroupId) -> Result<MulticastGroup, ServiceError> {
        self.inventory.read().await.group(group).cloned()
    }
}
