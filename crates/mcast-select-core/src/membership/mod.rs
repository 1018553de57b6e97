//! Membership status of devices in the target multicast group.

pub mod cache;

pub use cache::MembershipStatusCache;
