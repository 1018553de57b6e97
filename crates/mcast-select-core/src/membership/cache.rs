//! Memoized "is this device already in the group" answers.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::service::MembershipService;
use crate::types::{DeviceId, GroupId, MemberFilter};

/// Append-only membership cache for one multicast group.
///
/// An id is looked up at most once after it has resolved. Two queries for the
/// same unresolved id issued before either finishes are not merged here; the
/// controller never issues more than one per page.
pub struct MembershipStatusCache<M> {
    service: Arc<M>,
    group: GroupId,
    records: HashMap<DeviceId, bool>,
}

impl<M> MembershipStatusCache<M>
where
    M: MembershipService + 'static,
{
    pub fn new(service: Arc<M>, group: GroupId) -> Self {
        Self {
            service,
            group,
            records: HashMap::new(),
        }
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    /// Cached answer for `id`, if it has resolved.
    pub fn get(&self, id: &DeviceId) -> Option<bool> {
        self.records.get(id).copied()
    }

    pub fn is_joined(&self, id: &DeviceId) -> bool {
        self.get(id) == Some(true)
    }

    /// Every id known to already be a member.
    pub fn joined(&self) -> BTreeSet<DeviceId> {
        self.records
            .iter()
            .filter(|(_, joined)| **joined)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Store a resolved answer. The first answer for an id is kept.
    ///
    /// Returns `false` when the id was already resolved.
    pub fn record(&mut self, id: DeviceId, joined: bool) -> bool {
        if self.records.contains_key(&id) {
            return false;
        }
        self.records.insert(id, joined);
        true
    }

    /// Build the membership probe for `id` without touching the cache.
    ///
    /// The future owns its service handle so a page's probes can be polled
    /// together while the caller keeps mutable access to the cache; feed the
    /// answer back through [`record`](Self::record).
    pub fn lookup(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = (DeviceId, Result<bool, ServiceError>)> + Send + 'static {
        let service = Arc::clone(&self.service);
        let filter = MemberFilter::for_device(&self.group, &id);

        async move {
            let result = match service.count_members(&filter).await {
                Ok(count) => Ok(count == 1),
                Err(e @ ServiceError::LookupFailed { .. }) => Err(e),
                Err(e) => Err(ServiceError::LookupFailed {
                    device: id.clone(),
                    message: e.to_string(),
                }),
            };
            (id, result)
        }
    }

    /// Answer for `id`, looking it up only if it has not resolved yet.
    pub async fn query(&mut self, id: &DeviceId) -> Result<bool, ServiceError> {
        if let Some(joined) = self.get(id) {
            return Ok(joined);
        }

        let (id, result) = self.lookup(id.clone()).await;
        match result {
            Ok(joined) => {
                debug!(device = %id, joined, "membership resolved");
                self.record(id, joined);
                Ok(joined)
            }
            Err(e) => {
                warn!(device = %id, error = %e, "membership lookup failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMembers;

    fn cache_with(members: &[&str]) -> (MembershipStatusCache<MockMembers>, Arc<MockMembers>) {
        let service = Arc::new(MockMembers::new(members));
        let cache = MembershipStatusCache::new(service.clone(), GroupId::from("group-1"));
        (cache, service)
    }

    #[tokio::test]
    async fn test_query_looks_up_once() {
        let (mut cache, service) = cache_with(&["A"]);
        let a = DeviceId::from("A");

        assert!(cache.query(&a).await.unwrap());
        assert!(cache.query(&a).await.unwrap());

        assert_eq!(service.calls_for(&a), 1);
        assert_eq!(service.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_query_not_member() {
        let (mut cache, _service) = cache_with(&["A"]);
        let b = DeviceId::from("B");

        assert!(!cache.query(&b).await.unwrap());
        assert_eq!(cache.get(&b), Some(false));
        assert!(cache.joined().is_empty());
    }

    #[tokio::test]
    async fn test_failed_lookup_is_not_cached() {
        let (mut cache, service) = cache_with(&[]);
        let a = DeviceId::from("A");
        service.fail_for(&a);

        let err = cache.query(&a).await.unwrap_err();
        assert!(matches!(err, ServiceError::LookupFailed { ref device, .. } if *device == a));
        assert_eq!(cache.get(&a), None);

        service.recover(&a);
        assert!(!cache.query(&a).await.unwrap());
        assert_eq!(service.calls_for(&a), 2);
    }

    #[tokio::test]
    async fn test_lookup_is_detached_from_cache() {
        let (mut cache, service) = cache_with(&["A"]);

        let first = cache.lookup(DeviceId::from("A"));
        let second = cache.lookup(DeviceId::from("B"));

        // Both probes are built before either resolves; results arrive in
        // reverse order and are recorded afterwards.
        let (b, b_joined) = second.await;
        let (a, a_joined) = first.await;
        cache.record(b, b_joined.unwrap());
        cache.record(a, a_joined.unwrap());

        let joined: Vec<DeviceId> = cache.joined().into_iter().collect();
        assert_eq!(joined, vec![DeviceId::from("A")]);
        assert_eq!(service.total_calls(), 2);
    }

    #[test]
    fn test_record_keeps_first_answer() {
        let (mut cache, _service) = cache_with(&[]);
        let a = DeviceId::from("A");

        assert!(cache.record(a.clone(), true));
        assert!(!cache.record(a.clone(), false));
        assert!(cache.is_joined(&a));
        assert_eq!(cache.len(), 1);
    }
}
