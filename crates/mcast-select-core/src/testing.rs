//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::ServiceError;
use crate::service::{ApplicationDirectory, DeviceDirectory, MembershipService, MulticastGroupService};
use crate::types::{
    Application, Device, DeviceFilter, DeviceId, DevicePage, GroupId, MemberFilter,
    MulticastGroup, SourceId,
};

pub fn device(eui: &str, application: i64) -> Device {
    Device {
        dev_eui: DeviceId::from(eui),
        name: format!("device-{}", eui),
        application_id: SourceId(application),
        device_profile_name: "class-c".to_string(),
        last_seen_at: None,
    }
}

/// Membership service answering from a fixed member list and counting probes.
pub struct MockMembers {
    members: HashSet<DeviceId>,
    failing: Mutex<HashSet<DeviceId>>,
    calls: Mutex<HashMap<DeviceId, usize>>,
}

impl MockMembers {
    pub fn new(members: &[&str]) -> Self {
        Self {
            members: members.iter().map(|m| DeviceId::from(*m)).collect(),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn fail_for(&self, id: &DeviceId) {
        self.failing.lock().unwrap().insert(id.clone());
    }

    pub fn recover(&self, id: &DeviceId) {
        self.failing.lock().unwrap().remove(id);
    }

    pub fn calls_for(&self, id: &DeviceId) -> usize {
        self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl MembershipService for MockMembers {
    async fn count_members(&self, filter: &MemberFilter) -> Result<u64, ServiceError> {
        let id = DeviceId::new(filter.search.clone().unwrap_or_default());
        *self.calls.lock().unwrap().entry(id.clone()).or_insert(0) += 1;

        if self.failing.lock().unwrap().contains(&id) {
            return Err(ServiceError::NotFound(format!("membership of {}", id)));
        }

        Ok(u64::from(self.members.contains(&id)))
    }
}

pub struct MockDirectory {
    devices: Vec<Device>,
}

impl MockDirectory {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }
}

impl DeviceDirectory for MockDirectory {
    async fn list_devices(&self, filter: &DeviceFilter) -> Result<DevicePage, ServiceError> {
        let matching: Vec<Device> = self
            .devices
            .iter()
            .filter(|d| d.application_id == filter.source)
            .filter(|d| match &filter.search {
                Some(search) => d.dev_eui.as_str().contains(search.as_str()) || d.name.contains(search.as_str()),
                None => true,
            })
            .cloned()
            .collect();

        Ok(DevicePage {
            total_count: matching.len(),
            devices: matching
                .into_iter()
                .skip(filter.offset)
                .take(filter.limit)
                .collect(),
        })
    }
}

/// Group mutation sink recording what it was asked to do.
#[derive(Default)]
pub struct MockGroups {
    fail: bool,
    submissions: Mutex<Vec<(GroupId, Option<SourceId>, Vec<DeviceId>)>>,
}

impl MockGroups {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn submissions(&self) -> Vec<(GroupId, Option<SourceId>, Vec<DeviceId>)> {
        self.submissions.lock().unwrap().clone()
    }

    fn push(
        &self,
        group: &GroupId,
        source: Option<SourceId>,
        devices: &[DeviceId],
    ) -> Result<(), ServiceError> {
        if self.fail {
            return Err(ServiceError::NotFound(format!("group {}", group)));
        }
        self.submissions
            .lock()
            .unwrap()
            .push((group.clone(), source, devices.to_vec()));
        Ok(())
    }
}

impl MulticastGroupService for MockGroups {
    async fn add_devices(&self, group: &GroupId, devices: &[DeviceId]) -> Result<(), ServiceError> {
        self.push(group, None, devices)
    }

    async fn add_source_devices(
        &self,
        group: &GroupId,
        source: SourceId,
        exceptions: &[DeviceId],
    ) -> Result<(), ServiceError> {
        self.push(group, Some(source), exceptions)
    }
}

pub struct MockApplications {
    group_profile: String,
    applications: Vec<Application>,
}

impl MockApplications {
    pub fn new(group_profile: &str, applications: &[(i64, &str)]) -> Self {
        Self {
            group_profile: group_profile.to_string(),
            applications: applications
                .iter()
                .map(|(id, profile)| Application {
                    id: SourceId(*id),
                    name: format!("app-{}", id),
                    service_profile_id: profile.to_string(),
                })
                .collect(),
        }
    }
}

impl ApplicationDirectory for MockApplications {
    async fn list_applications(&self, _search: Option<&str>) -> Result<Vec<Application>, ServiceError> {
        Ok(self.applications.clone())
    }

    async fn get_group(&self, group: &GroupId) -> Result<MulticastGroup, ServiceError> {
        Ok(MulticastGroup {
            id: group.clone(),
            name: "test group".to_string(),
            service_profile_id: self.group_profile.clone(),
        })
    }
}
