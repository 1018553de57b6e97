//! Source eligibility.
//!
//! A device can only join a multicast group under the same service profile,
//! so the source picker only offers applications sharing the group's profile.

use crate::types::{Application, MulticastGroup};

pub fn is_eligible_source(application: &Application, group: &MulticastGroup) -> bool {
    application.service_profile_id == group.service_profile_id
}

/// Filter `applications` down to the ones the group can draw devices from.
pub fn eligible_sources(applications: Vec<Application>, group: &MulticastGroup) -> Vec<Application> {
    applications
        .into_iter()
        .filter(|a| is_eligible_source(a, group))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GroupId, SourceId};

    fn app(id: i64, profile: &str) -> Application {
        Application {
            id: SourceId(id),
            name: format!("app-{}", id),
            service_profile_id: profile.to_string(),
        }
    }

    #[test]
    fn test_eligible_sources_filters_by_service_profile() {
        let group = MulticastGroup {
            id: GroupId::from("g1"),
            name: "street lights".to_string(),
            service_profile_id: "sp-a".to_string(),
        };

        let apps = vec![app(1, "sp-a"), app(2, "sp-b"), app(3, "sp-a")];
        let eligible = eligible_sources(apps, &group);

        let ids: Vec<i64> = eligible.iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
