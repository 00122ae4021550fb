//! Client capabilities handed to every lifecycle operation

use crate::appservice::storage::DEFAULT_STORAGE_ENDPOINT_SUFFIX;
use crate::arm::poller::DEFAULT_POLL_INTERVAL;
use crate::arm::{Poller, Transport};
use crate::web::{self, AppServiceEnvironmentsClient, AppServicePlansClient, WebAppsClient};
use std::sync::Arc;
use std::time::Duration;

/// Everything an adapter may call. Built once by the host and passed
/// explicitly into Create/Read/Update/Delete.
#[derive(Clone)]
pub struct Clients {
    pub subscription_id: String,
    pub web_apps: WebAppsClient,
    pub service_plans: AppServicePlansClient,
    pub environments: AppServiceEnvironmentsClient,
    pub poller: Poller,
    /// Suffix used when building storage connection strings
    pub storage_endpoint_suffix: String,
    transport: Arc<dyn Transport>,
}

impl Clients {
    pub fn new(transport: Arc<dyn Transport>, subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            web_apps: WebAppsClient::new(web::codec(transport.clone())),
            service_plans: AppServicePlansClient::new(web::codec(transport.clone())),
            environments: AppServiceEnvironmentsClient::new(web::codec(transport.clone())),
            poller: Poller::new(transport.clone(), DEFAULT_POLL_INTERVAL),
            storage_endpoint_suffix: DEFAULT_STORAGE_ENDPOINT_SUFFIX.to_string(),
            transport,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poller = Poller::new(self.transport.clone(), interval);
        self
    }

    pub fn with_storage_endpoint_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.storage_endpoint_suffix = suffix.into();
        self
    }
}

impl std::fmt::Debug for Clients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clients")
            .field("subscription_id", &self.subscription_id)
            .field("poller", &self.poller)
            .field("storage_endpoint_suffix", &self.storage_endpoint_suffix)
            .finish_non_exhaustive()
    }
}
