//! Managed identity identifiers

use super::{ResourceId, Segment};
use std::fmt;

/// `/subscriptions/{}/resourceGroups/{}/providers/Microsoft.ManagedIdentity/userAssignedIdentities/{}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserAssignedIdentityId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

const USER_ASSIGNED_IDENTITY_SEGMENTS: &[Segment] = &[
    Segment::Static("subscriptions"),
    Segment::Value("subscription_id"),
    Segment::Static("resourceGroups"),
    Segment::Value("resource_group"),
    Segment::Static("providers"),
    Segment::Static("Microsoft.ManagedIdentity"),
    Segment::Static("userAssignedIdentities"),
    Segment::Value("name"),
];

impl ResourceId for UserAssignedIdentityId {
    const KIND: &'static str = "User Assigned Identity";

    fn segments() -> &'static [Segment] {
        USER_ASSIGNED_IDENTITY_SEGMENTS
    }

    fn from_values(values: Vec<String>) -> Self {
        let mut values = values.into_iter();
        Self {
            subscription_id: values.next().unwrap_or_default(),
            resource_group: values.next().unwrap_or_default(),
            name: values.next().unwrap_or_default(),
        }
    }

    fn values(&self) -> Vec<&str> {
        vec![&self.subscription_id, &self.resource_group, &self.name]
    }
}

impl fmt::Display for UserAssignedIdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User Assigned Identity (Subscription: {:?} / Resource Group Name: {:?} / Name: {:?})",
            self.subscription_id, self.resource_group, self.name
        )
    }
}
