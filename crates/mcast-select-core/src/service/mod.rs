//! External collaborators of the selection core.
//!
//! The core never talks to the network itself. Page loads, membership probes
//! and the final group mutation go through these traits; the CLI backs them
//! with the file inventory in [`crate::storage`].

pub mod sources;

use std::future::Future;

use crate::error::ServiceError;
use crate::types::{
    Application, DeviceFilter, DeviceId, DevicePage, GroupId, MemberFilter, MulticastGroup,
    SourceId,
};

pub use sources::{eligible_sources, is_eligible_source};

/// Paginated, filterable device listing.
pub trait DeviceDirectory: Send + Sync {
    fn list_devices(
        &self,
        filter: &DeviceFilter,
    ) -> impl Future<Output = Result<DevicePage, ServiceError>> + Send;
}

/// Multicast group membership listing.
///
/// Only the count matters to the core: a search by device id limited to one
/// result answers "is this device already a member".
pub trait MembershipService: Send + Sync {
    fn count_members(
        &self,
        filter: &MemberFilter,
    ) -> impl Future<Output = Result<u64, ServiceError>> + Send;
}

/// Sink for a finished selection.
pub trait MulticastGroupService: Send + Sync {
    /// Add an explicit list of devices.
    fn add_devices(
        &self,
        group: &GroupId,
        devices: &[DeviceId],
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Add every device of `source` except `exceptions`.
    fn add_source_devices(
        &self,
        group: &GroupId,
        source: SourceId,
        exceptions: &[DeviceId],
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

/// Application and group metadata used to pick a source.
pub trait ApplicationDirectory: Send + Sync {
    fn list_applications(
        &self,
        search: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Application>, ServiceError>> + Send;

    fn get_group(
        &self,
        group: &GroupId,
    ) -> impl Future<Output = Result<MulticastGroup, ServiceError>> + Send;
}
