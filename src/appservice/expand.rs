//! Desired state to wire model

use super::app_settings::{
    self, APP_INSIGHTS_CONNECTION_STRING, APP_INSIGHTS_KEY, CONTENT_CONNECTION_STRING, CONTENT_SHARE,
    DOCKER_REGISTRY_PASSWORD, DOCKER_REGISTRY_URL, DOCKER_REGISTRY_USERNAME, FUNCTIONS_EXTENSION_VERSION,
    FUNCTIONS_WORKER_RUNTIME, HEALTH_CHECK_MAX_PING_FAILURES, WEB_JOBS_DASHBOARD, WEB_JOBS_DASHBOARD_ACCOUNT_NAME,
};
use super::fx_version;
use super::model::{
    AppServiceLogs, ApplicationStack, AuthSettings, Backup, ConnectionString, Cors, Identity, IpRestriction,
    LinuxFunctionAppSlotModel, SiteConfig,
};
use super::storage::{self, StorageConnection};
use crate::web::models::{
    self as wire, ApiDefinitionInfo, BackupRequest, BackupRequestProperties, ConnStringValueTypePair,
    ConnectionStringDictionary, CorsSettings, FileSystemHttpLogsConfig, HttpLogsConfig, IpSecurityRestriction,
    ManagedServiceIdentity, NameValuePair, SiteAuthSettings, SiteAuthSettingsProperties, SiteLogsConfig,
    SiteLogsConfigProperties, UserAssignedIdentity,
};
use std::collections::BTreeMap;

/// Kind sent for every Linux Function App slot
pub const SITE_KIND: &str = "functionapp,linux";

const SERVICE_TAG: &str = "ServiceTag";

/// Inputs to [`expand_site_config`] that live outside `site_config`
#[derive(Debug, Clone)]
pub struct ExpandContext<'a> {
    pub functions_extension_version: &'a str,
    pub storage: &'a StorageConnection,
}

/// Build the wire site config
///
/// When `existing` is given its fields are the starting point, so settings
/// this schema does not manage survive a full-document PUT. The returned
/// config's `app_settings` hold only the framework-managed keys; callers
/// merge user settings with [`app_settings::merge_user_app_settings`].
pub fn expand_site_config(
    config: &SiteConfig,
    existing: Option<&wire::SiteConfig>,
    ctx: &ExpandContext<'_>,
) -> wire::SiteConfig {
    let mut expanded = existing.cloned().unwrap_or_default();

    let mut settings = vec![
        NameValuePair::new(FUNCTIONS_EXTENSION_VERSION, ctx.functions_extension_version),
        NameValuePair::new(ctx.storage.app_setting_key(), &ctx.storage.value()),
    ];

    if !config.application_insights_key.is_empty() {
        settings.push(NameValuePair::new(APP_INSIGHTS_KEY, &config.application_insights_key));
    }
    if !config.application_insights_connection_string.is_empty() {
        settings.push(NameValuePair::new(
            APP_INSIGHTS_CONNECTION_STRING,
            &config.application_insights_connection_string,
        ));
    }
    if config.health_check_eviction_time_in_min != 0 {
        settings.push(NameValuePair::new(
            HEALTH_CHECK_MAX_PING_FAILURES,
            &config.health_check_eviction_time_in_min.to_string(),
        ));
    }

    if let Some(stack) = &config.application_stack {
        if let Some(runtime) = stack.worker_runtime() {
            settings.push(NameValuePair::new(FUNCTIONS_WORKER_RUNTIME, runtime));
        }
        if let ApplicationStack::Docker(docker) = stack {
            settings.push(NameValuePair::new(DOCKER_REGISTRY_URL, &docker.registry_url));
            if !docker.registry_username.is_empty() {
                settings.push(NameValuePair::new(DOCKER_REGISTRY_USERNAME, &docker.registry_username));
            }
            if !docker.registry_password.is_empty() {
                settings.push(NameValuePair::new(DOCKER_REGISTRY_PASSWORD, &docker.registry_password));
            }
        }
    }
    expanded.linux_fx_version = Some(fx_version::encode(config.application_stack.as_ref()));

    expanded.always_on = Some(config.always_on);
    expanded.api_definition = non_empty(&config.api_definition_url).map(|url| ApiDefinitionInfo { url: Some(url) });
    expanded.app_command_line = Some(config.app_command_line.clone());
    expanded.function_app_scale_limit = non_zero(config.app_scale_limit);
    expanded.auto_swap_slot_name = non_empty(&config.auto_swap_slot_name);
    expanded.cors = config.cors.as_ref().map(expand_cors);
    expanded.default_documents = Some(config.default_documents.clone());
    expanded.minimum_elastic_instance_count = non_zero(config.elastic_instance_minimum);
    expanded.ftps_state = non_empty(&config.ftps_state);
    expanded.health_check_path = non_empty(&config.health_check_path);
    expanded.http20_enabled = Some(config.http2_enabled);
    expanded.ip_security_restrictions = Some(config.ip_restriction.iter().map(expand_ip_restriction).collect());
    expanded.load_balancing = non_empty(&config.load_balancing_mode);
    expanded.managed_pipeline_mode = non_empty(&config.managed_pipeline_mode);
    expanded.min_tls_version = non_empty(&config.minimum_tls_version);
    expanded.scm_min_tls_version = non_empty(&config.scm_minimum_tls_version);
    expanded.pre_warmed_instance_count = non_zero(config.pre_warmed_instance_count);
    expanded.remote_debugging_enabled = Some(config.remote_debugging_enabled);
    expanded.remote_debugging_version = non_empty(&config.remote_debugging_version);
    expanded.functions_runtime_scale_monitoring_enabled = Some(config.runtime_scale_monitoring_enabled);
    expanded.use_32_bit_worker_process = Some(config.use_32_bit_worker);
    expanded.vnet_route_all_enabled = Some(config.vnet_route_all_enabled);
    expanded.web_sockets_enabled = Some(config.websockets_enabled);
    expanded.number_of_workers = non_zero(config.worker_count);

    expanded.app_settings = Some(settings);
    expanded
}

/// The dashboard setting added when built-in logging is on
///
/// With managed identity only the account-name form is written; the
/// connection-string key is never populated in that case.
pub fn builtin_logging_setting(storage: &StorageConnection) -> (&'static str, String) {
    match storage {
        StorageConnection::ManagedIdentity { account_name } => {
            (WEB_JOBS_DASHBOARD_ACCOUNT_NAME, account_name.clone())
        }
        other => (WEB_JOBS_DASHBOARD, other.value()),
    }
}

/// The user-level app settings sent on Create: the user's own map plus the
/// dashboard and content share settings
pub fn create_app_settings(
    model: &LinuxFunctionAppSlotModel,
    storage: &StorageConnection,
    send_content_settings: bool,
) -> BTreeMap<String, String> {
    let mut settings = model.app_settings.clone();
    if model.builtin_logging_enabled {
        let (key, value) = builtin_logging_setting(storage);
        settings.insert(key.to_string(), value);
    }
    if send_content_settings {
        settings
            .entry(CONTENT_SHARE.to_string())
            .or_insert_with(|| storage::content_share_name(&model.name));
        settings
            .entry(CONTENT_CONNECTION_STRING.to_string())
            .or_insert_with(|| storage.value());
    }
    settings
}

/// Full wire config with user settings merged in
pub fn expand_with_user_settings(
    model: &LinuxFunctionAppSlotModel,
    existing: Option<&wire::SiteConfig>,
    ctx: &ExpandContext<'_>,
    user_settings: &BTreeMap<String, String>,
) -> wire::SiteConfig {
    let mut config = expand_site_config(&model.site_config, existing, ctx);
    let framework = config.app_settings.take().unwrap_or_default();
    config.app_settings = Some(app_settings::merge_user_app_settings(framework, user_settings));
    config
}

fn expand_cors(cors: &Cors) -> CorsSettings {
    CorsSettings {
        allowed_origins: Some(cors.allowed_origins.clone()),
        support_credentials: Some(cors.support_credentials),
    }
}

fn expand_ip_restriction(restriction: &IpRestriction) -> IpSecurityRestriction {
    let mut expanded = IpSecurityRestriction {
        name: non_empty(&restriction.name),
        priority: Some(restriction.priority),
        action: non_empty(&restriction.action),
        ..Default::default()
    };
    if !restriction.ip_address.is_empty() {
        expanded.ip_address = Some(restriction.ip_address.clone());
    }
    if !restriction.service_tag.is_empty() {
        expanded.ip_address = Some(restriction.service_tag.clone());
        expanded.tag = Some(SERVICE_TAG.to_string());
    }
    if !restriction.virtual_network_subnet_id.is_empty() {
        expanded.vnet_subnet_resource_id = Some(restriction.virtual_network_subnet_id.clone());
    }
    expanded
}

/// Connection strings as a dictionary; `None` when there are none
pub fn expand_connection_strings(input: &[ConnectionString]) -> Option<ConnectionStringDictionary> {
    if input.is_empty() {
        return None;
    }
    let properties = input
        .iter()
        .map(|c| {
            (
                c.name.clone(),
                ConnStringValueTypePair {
                    value: c.value.clone(),
                    connection_type: c.connection_type.clone(),
                },
            )
        })
        .collect();
    Some(ConnectionStringDictionary {
        properties: Some(properties),
    })
}

/// Auth settings to send; `None` leaves auth untouched on Create
pub fn expand_auth_settings(input: Option<&AuthSettings>) -> Option<SiteAuthSettings> {
    let auth = input?;
    let mut props = SiteAuthSettingsProperties {
        enabled: Some(auth.enabled),
        runtime_version: non_empty(&auth.runtime_version),
        unauthenticated_client_action: non_empty(&auth.unauthenticated_client_action),
        token_store_enabled: Some(auth.token_store_enabled),
        allowed_external_redirect_urls: Some(auth.allowed_external_redirect_urls.clone()),
        default_provider: non_empty(&auth.default_provider),
        token_refresh_extension_hours: Some(auth.token_refresh_extension_hours),
        issuer: non_empty(&auth.issuer),
        ..Default::default()
    };

    if !auth.additional_login_parameters.is_empty() {
        props.additional_login_params = Some(
            auth.additional_login_parameters
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect(),
        );
    }

    if let Some(aad) = &auth.active_directory {
        props.client_id = non_empty(&aad.client_id);
        props.client_secret = non_empty(&aad.client_secret);
        props.allowed_audiences = Some(aad.allowed_audiences.clone());
    }
    if let Some(facebook) = &auth.facebook {
        props.facebook_app_id = non_empty(&facebook.client_id);
        props.facebook_app_secret = non_empty(&facebook.client_secret);
        props.facebook_oauth_scopes = Some(facebook.oauth_scopes.clone());
    }
    if let Some(github) = &auth.github {
        props.github_client_id = non_empty(&github.client_id);
        props.github_client_secret = non_empty(&github.client_secret);
        props.github_oauth_scopes = Some(github.oauth_scopes.clone());
    }
    if let Some(google) = &auth.google {
        props.google_client_id = non_empty(&google.client_id);
        props.google_client_secret = non_empty(&google.client_secret);
        props.google_oauth_scopes = Some(google.oauth_scopes.clone());
    }
    if let Some(microsoft) = &auth.microsoft {
        props.microsoft_account_client_id = non_empty(&microsoft.client_id);
        props.microsoft_account_client_secret = non_empty(&microsoft.client_secret);
        props.microsoft_account_oauth_scopes = Some(microsoft.oauth_scopes.clone());
    }

    Some(SiteAuthSettings {
        properties: Some(props),
    })
}

/// Payload that switches authentication off
pub fn disabled_auth_settings() -> SiteAuthSettings {
    SiteAuthSettings {
        properties: Some(SiteAuthSettingsProperties {
            enabled: Some(false),
            ..Default::default()
        }),
    }
}

pub fn expand_backup(input: Option<&Backup>) -> Option<BackupRequest> {
    let backup = input?;
    let schedule = &backup.schedule;
    Some(BackupRequest {
        properties: Some(BackupRequestProperties {
            backup_name: non_empty(&backup.name),
            enabled: Some(backup.enabled),
            storage_account_url: backup.storage_account_url.clone(),
            backup_schedule: Some(wire::BackupSchedule {
                frequency_interval: schedule.frequency_interval,
                frequency_unit: schedule.frequency_unit.clone(),
                keep_at_least_one_backup: schedule.keep_at_least_one_backup,
                retention_period_in_days: schedule.retention_period_days,
                start_time: non_empty(&schedule.start_time),
                last_execution_time: None,
            }),
        }),
    })
}

/// File system HTTP logging; `None` switches it off
pub fn expand_app_service_logs(input: Option<&AppServiceLogs>) -> SiteLogsConfig {
    let file_system = match input {
        Some(logs) => FileSystemHttpLogsConfig {
            retention_in_mb: Some(logs.disk_quota_mb),
            retention_in_days: Some(logs.retention_period_days),
            enabled: Some(true),
        },
        None => FileSystemHttpLogsConfig {
            enabled: Some(false),
            ..Default::default()
        },
    };
    SiteLogsConfig {
        properties: Some(SiteLogsConfigProperties {
            http_logs: Some(HttpLogsConfig {
                file_system: Some(file_system),
            }),
        }),
    }
}

/// Managed identity block; no identity is sent as type `None`
pub fn expand_identity(input: Option<&Identity>) -> ManagedServiceIdentity {
    let Some(identity) = input else {
        return ManagedServiceIdentity {
            identity_type: "None".to_string(),
            ..Default::default()
        };
    };

    let user_assigned_identities = if identity.identity_type.has_user_assigned() {
        Some(
            identity
                .identity_ids
                .iter()
                .map(|id| (id.clone(), UserAssignedIdentity::default()))
                .collect(),
        )
    } else {
        None
    };

    ManagedServiceIdentity {
        identity_type: identity.identity_type.as_str().to_string(),
        user_assigned_identities,
        ..Default::default()
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn non_zero(value: i32) -> Option<i32> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}
