//! App setting names and merging
//!
//! Function Apps keep most of their runtime wiring in app settings. Some of
//! those keys are owned by dedicated schema fields; the rest are free-form
//! user settings.

use crate::web::models::NameValuePair;
use std::collections::BTreeMap;

pub const FUNCTIONS_EXTENSION_VERSION: &str = "FUNCTIONS_EXTENSION_VERSION";
pub const FUNCTIONS_WORKER_RUNTIME: &str = "FUNCTIONS_WORKER_RUNTIME";
pub const WEB_JOBS_STORAGE: &str = "AzureWebJobsStorage";
pub const WEB_JOBS_STORAGE_ACCOUNT_NAME: &str = "AzureWebJobsStorage__accountName";
pub const WEB_JOBS_DASHBOARD: &str = "AzureWebJobsDashboard";
pub const WEB_JOBS_DASHBOARD_ACCOUNT_NAME: &str = "AzureWebJobsDashboard__accountName";
pub const CONTENT_SHARE: &str = "WEBSITE_CONTENTSHARE";
pub const CONTENT_CONNECTION_STRING: &str = "WEBSITE_CONTENTAZUREFILECONNECTIONSTRING";
pub const RUN_FROM_PACKAGE: &str = "WEBSITE_RUN_FROM_PACKAGE";
pub const NODE_DEFAULT_VERSION: &str = "WEBSITE_NODE_DEFAULT_VERSION";
pub const HTTP_LOGGING_RETENTION_DAYS: &str = "WEBSITE_HTTPLOGGING_RETENTION_DAYS";
pub const HEALTH_CHECK_MAX_PING_FAILURES: &str = "WEBSITE_HEALTHCHECK_MAXPINGFAILURES";
pub const APP_INSIGHTS_KEY: &str = "APPINSIGHTS_INSTRUMENTATIONKEY";
pub const APP_INSIGHTS_CONNECTION_STRING: &str = "APPLICATIONINSIGHTS_CONNECTION_STRING";
pub const DOCKER_REGISTRY_URL: &str = "DOCKER_REGISTRY_SERVER_URL";
pub const DOCKER_REGISTRY_USERNAME: &str = "DOCKER_REGISTRY_SERVER_USERNAME";
pub const DOCKER_REGISTRY_PASSWORD: &str = "DOCKER_REGISTRY_SERVER_PASSWORD";

/// Keys synthesized by the service or by Create that are only reported
/// back when the user set them explicitly
pub const SYNTHESIZED: &[&str] = &[
    CONTENT_SHARE,
    CONTENT_CONNECTION_STRING,
    FUNCTIONS_WORKER_RUNTIME,
    RUN_FROM_PACKAGE,
];

/// Merge user settings into the framework-managed list
///
/// A user key never replaces a framework key that is already present; the
/// conflict is logged and the framework value kept. Output is ordered by
/// key so repeated expansions produce identical request bodies.
pub fn merge_user_app_settings(
    framework: Vec<NameValuePair>,
    user: &BTreeMap<String, String>,
) -> Vec<NameValuePair> {
    let mut merged = to_map(&framework);
    for (key, value) in user {
        match merged.get(key) {
            Some(existing) if existing != value => {
                tracing::warn!(
                    "app setting {:?} is managed by a dedicated field; ignoring the value from app_settings",
                    key
                );
            }
            Some(_) => {}
            None => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    from_map(&merged)
}

/// Collapse a name/value list into a map; later duplicates win
pub fn to_map(pairs: &[NameValuePair]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .filter_map(|pair| {
            let name = pair.name.as_ref()?;
            Some((name.clone(), pair.value.clone().unwrap_or_default()))
        })
        .collect()
}

pub fn from_map(map: &BTreeMap<String, String>) -> Vec<NameValuePair> {
    map.iter().map(|(k, v)| NameValuePair::new(k, v)).collect()
}
