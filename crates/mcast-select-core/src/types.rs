//! Type definitions shared by the selection core, the services and the CLI.
//!
//! Records are serialized with camelCase field names, matching the inventory
//! file and the JSON the application server speaks.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque device identifier (a DevEUI in practice).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Application identifier. Applications are the sources devices are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub i64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Multicast group identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A device as listed by the device directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Device EUI (primary identifier)
    pub dev_eui: DeviceId,
    /// Human readable name
    pub name: String,
    /// Owning application
    pub application_id: SourceId,
    /// Name of the device profile
    #[serde(default)]
    pub device_profile_name: String,
    /// Last uplink timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// An application (device source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: SourceId,
    pub name: String,
    pub service_profile_id: String,
}

/// A multicast group devices can be enrolled into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticastGroup {
    pub id: GroupId,
    pub name: String,
    pub service_profile_id: String,
}

/// One page of the device directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePage {
    pub devices: Vec<Device>,
    /// Number of devices matching the filter across all pages
    pub total_count: usize,
}

impl DevicePage {
    pub fn ids(&self) -> Vec<DeviceId> {
        self.devices.iter().map(|d| d.dev_eui.clone()).collect()
    }
}

/// Filter for listing the devices of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    pub source: SourceId,
    pub search: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl DeviceFilter {
    pub fn new(source: SourceId, limit: usize) -> Self {
        Self {
            source,
            search: None,
            limit,
            offset: 0,
        }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.is_empty());
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.offset = page * self.limit;
        self
    }
}

/// Filter for listing the members of a multicast group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberFilter {
    pub group: GroupId,
    pub search: Option<String>,
    pub limit: usize,
}

impl MemberFilter {
    /// The membership probe for a single device: search by its id, one result.
    pub fn for_device(group: &GroupId, device: &DeviceId) -> Self {
        Self {
            group: group.clone(),
            search: Some(device.as_str().to_string()),
            limit: 1,
        }
    }
}
