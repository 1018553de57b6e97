//! Error types for mcast-select core.

use thiserror::Error;

use crate::types::{DeviceId, GroupId, SourceId};

/// Core error type for shared operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Barrier error: {0}")]
    Barrier(#[from] BarrierError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Selection state machine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("No source application has been chosen")]
    NoSourceChosen,

    #[error("Device {device} is already a member of the multicast group")]
    InvalidToggle { device: DeviceId },

    #[error("Selection is empty")]
    EmptySelection,

    #[error("Application {application} is not fully loaded ({known} devices known)")]
    IncompleteEnumeration { application: SourceId, known: usize },

    #[error("Application {application} does not share the service profile of group {group}")]
    IneligibleSource { application: SourceId, group: GroupId },
}

/// Fan-out barrier misuse. These are programming errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BarrierError {
    #[error("Barrier generation {generation} completed more than {expected} times")]
    Overuse { generation: u64, expected: usize },
}

/// Failures reported by external collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Membership lookup for {device} failed: {message}")]
    LookupFailed { device: DeviceId, message: String },

    #[error("Loading devices of application {application} failed: {message}")]
    PageLoadFailed { application: SourceId, message: String },

    #[error("Adding devices to group {group} failed: {message}")]
    SubmitFailed { group: GroupId, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service profile of device {device} differs from group {group}")]
    ServiceProfileMismatch { device: DeviceId, group: GroupId },

    #[error("Device {device} already belongs to the maximum of {limit} multicast groups")]
    GroupLimitReached { device: DeviceId, limit: usize },
}

/// Inventory storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access storage directory: {0}")]
    DirectoryAccess(String),

    #[error("Invalid DevEUI: {0}")]
    InvalidDevEui(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
