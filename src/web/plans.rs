//! App Service plan and environment lookups

use super::models::{AppServiceEnvironmentResource, AppServicePlan};
use crate::arm::codec::{ApiError, Codec, Operation};
use crate::ids::{AppServiceEnvironmentId, ResourceId, ServicePlanId};
use reqwest::Method;

const GET_PLAN: Operation = Operation {
    client: "web.AppServicePlansClient",
    name: "Get",
    method: Method::GET,
    suffix: "",
    expected: &[200],
};

const GET_ENVIRONMENT: Operation = Operation {
    client: "web.AppServiceEnvironmentsClient",
    name: "Get",
    method: Method::GET,
    suffix: "",
    expected: &[200],
};

#[derive(Clone, Debug)]
pub struct AppServicePlansClient {
    codec: Codec,
}

impl AppServicePlansClient {
    pub fn new(codec: Codec) -> Self {
        Self { codec }
    }

    pub async fn get(&self, id: &ServicePlanId) -> Result<AppServicePlan, ApiError> {
        self.codec.execute_model(&GET_PLAN, &id.id(), None, &[]).await
    }
}

#[derive(Clone, Debug)]
pub struct AppServiceEnvironmentsClient {
    codec: Codec,
}

impl AppServiceEnvironmentsClient {
    pub fn new(codec: Codec) -> Self {
        Self { codec }
    }

    pub async fn get(&self, id: &AppServiceEnvironmentId) -> Result<AppServiceEnvironmentResource, ApiError> {
        self.codec
            .execute_model(&GET_ENVIRONMENT, &id.id(), None, &[])
            .await
    }
}
