//! App Service identifiers

use super::{ResourceId, Segment};
use std::fmt;

/// `/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/sites/{}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionAppId {
    pub subscription_id: String,
    pub resource_group: String,
    pub site_name: String,
}

impl FunctionAppId {
    pub fn new(subscription_id: &str, resource_group: &str, site_name: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            site_name: site_name.to_string(),
        }
    }

    /// Identifier of a slot beneath this app
    pub fn slot(&self, slot_name: &str) -> FunctionAppSlotId {
        FunctionAppSlotId::new(
            &self.subscription_id,
            &self.resource_group,
            &self.site_name,
            slot_name,
        )
    }
}

const FUNCTION_APP_SEGMENTS: &[Segment] = &[
    Segment::Static("subscriptions"),
    Segment::Value("subscription_id"),
    Segment::Static("resourceGroups"),
    Segment::Value("resource_group"),
    Segment::Static("providers"),
    Segment::Static("Microsoft.Web"),
    Segment::Static("sites"),
    Segment::Value("site_name"),
];

impl ResourceId for FunctionAppId {
    const KIND: &'static str = "Function App";

    fn segments() -> &'static [Segment] {
        FUNCTION_APP_SEGMENTS
    }

    fn from_values(values: Vec<String>) -> Self {
        let mut values = values.into_iter();
        Self {
            subscription_id: values.next().unwrap_or_default(),
            resource_group: values.next().unwrap_or_default(),
            site_name: values.next().unwrap_or_default(),
        }
    }

    fn values(&self) -> Vec<&str> {
        vec![&self.subscription_id, &self.resource_group, &self.site_name]
    }
}

impl fmt::Display for FunctionAppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Function App (Subscription: {:?} / Resource Group Name: {:?} / Site Name: {:?})",
            self.subscription_id, self.resource_group, self.site_name
        )
    }
}

/// `/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/sites/{}/slots/{}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionAppSlotId {
    pub subscription_id: String,
    pub resource_group: String,
    pub site_name: String,
    pub slot_name: String,
}

impl FunctionAppSlotId {
    pub fn new(subscription_id: &str, resource_group: &str, site_name: &str, slot_name: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            site_name: site_name.to_string(),
            slot_name: slot_name.to_string(),
        }
    }

    /// The Function App this slot belongs to
    pub fn parent(&self) -> FunctionAppId {
        FunctionAppId::new(&self.subscription_id, &self.resource_group, &self.site_name)
    }
}

const FUNCTION_APP_SLOT_SEGMENTS: &[Segment] = &[
    Segment::Static("subscriptions"),
    Segment::Value("subscription_id"),
    Segment::Static("resourceGroups"),
    Segment::Value("resource_group"),
    Segment::Static("providers"),
    Segment::Static("Microsoft.Web"),
    Segment::Static("sites"),
    Segment::Value("site_name"),
    Segment::Static("slots"),
    Segment::Value("slot_name"),
];

impl ResourceId for FunctionAppSlotId {
    const KIND: &'static str = "Function App Slot";

    fn segments() -> &'static [Segment] {
        FUNCTION_APP_SLOT_SEGMENTS
    }

    fn from_values(values: Vec<String>) -> Self {
        let mut values = values.into_iter();
        Self {
            subscription_id: values.next().unwrap_or_default(),
            resource_group: values.next().unwrap_or_default(),
            site_name: values.next().unwrap_or_default(),
            slot_name: values.next().unwrap_or_default(),
        }
    }

    fn values(&self) -> Vec<&str> {
        vec![
            &self.subscription_id,
            &self.resource_group,
            &self.site_name,
            &self.slot_name,
        ]
    }
}

impl fmt::Display for FunctionAppSlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Function App Slot (Subscription: {:?} / Resource Group Name: {:?} / Site Name: {:?} / Slot Name: {:?})",
            self.subscription_id, self.resource_group, self.site_name, self.slot_name
        )
    }
}

/// `/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/serverfarms/{}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServicePlanId {
    pub subscription_id: String,
    pub resource_group: String,
    pub serverfarm_name: String,
}

impl ServicePlanId {
    pub fn new(subscription_id: &str, resource_group: &str, serverfarm_name: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            serverfarm_name: serverfarm_name.to_string(),
        }
    }
}

const SERVICE_PLAN_SEGMENTS: &[Segment] = &[
    Segment::Static("subscriptions"),
    Segment::Value("subscription_id"),
    Segment::Static("resourceGroups"),
    Segment::Value("resource_group"),
    Segment::Static("providers"),
    Segment::Static("Microsoft.Web"),
    Segment::Static("serverfarms"),
    Segment::Value("serverfarm_name"),
];

impl ResourceId for ServicePlanId {
    const KIND: &'static str = "Service Plan";

    fn segments() -> &'static [Segment] {
        SERVICE_PLAN_SEGMENTS
    }

    fn from_values(values: Vec<String>) -> Self {
        let mut values = values.into_iter();
        Self {
            subscription_id: values.next().unwrap_or_default(),
            resource_group: values.next().unwrap_or_default(),
            serverfarm_name: values.next().unwrap_or_default(),
        }
    }

    fn values(&self) -> Vec<&str> {
        vec![&self.subscription_id, &self.resource_group, &self.serverfarm_name]
    }
}

impl fmt::Display for ServicePlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Service Plan (Subscription: {:?} / Resource Group Name: {:?} / Server Farm Name: {:?})",
            self.subscription_id, self.resource_group, self.serverfarm_name
        )
    }
}

/// `/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/hostingEnvironments/{}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppServiceEnvironmentId {
    pub subscription_id: String,
    pub resource_group: String,
    pub hosting_environment_name: String,
}

const APP_SERVICE_ENVIRONMENT_SEGMENTS: &[Segment] = &[
    Segment::Static("subscriptions"),
    Segment::Value("subscription_id"),
    Segment::Static("resourceGroups"),
    Segment::Value("resource_group"),
    Segment::Static("providers"),
    Segment::Static("Microsoft.Web"),
    Segment::Static("hostingEnvironments"),
    Segment::Value("hosting_environment_name"),
];

impl ResourceId for AppServiceEnvironmentId {
    const KIND: &'static str = "App Service Environment";

    fn segments() -> &'static [Segment] {
        APP_SERVICE_ENVIRONMENT_SEGMENTS
    }

    fn from_values(values: Vec<String>) -> Self {
        let mut values = values.into_iter();
        Self {
            subscription_id: values.next().unwrap_or_default(),
            resource_group: values.next().unwrap_or_default(),
            hosting_environment_name: values.next().unwrap_or_default(),
        }
    }

    fn values(&self) -> Vec<&str> {
        vec![
            &self.subscription_id,
            &self.resource_group,
            &self.hosting_environment_name,
        ]
    }
}

impl fmt::Display for AppServiceEnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "App Service Environment (Subscription: {:?} / Resource Group Name: {:?} / Hosting Environment Name: {:?})",
            self.subscription_id, self.resource_group, self.hosting_environment_name
        )
    }
}
