//! Wire model to desired state
//!
//! Absent or null remote values become zero values. Values the service
//! normalizes (tag casing, list ordering, timestamp formatting, identity
//! id casing) are reconciled against the prior record so they do not show
//! up as drift.

use super::app_settings::{
    APP_INSIGHTS_CONNECTION_STRING, APP_INSIGHTS_KEY, CONTENT_CONNECTION_STRING, CONTENT_SHARE,
    DOCKER_REGISTRY_PASSWORD, DOCKER_REGISTRY_URL, DOCKER_REGISTRY_USERNAME, FUNCTIONS_EXTENSION_VERSION,
    FUNCTIONS_WORKER_RUNTIME, HEALTH_CHECK_MAX_PING_FAILURES, HTTP_LOGGING_RETENTION_DAYS, NODE_DEFAULT_VERSION,
    RUN_FROM_PACKAGE, WEB_JOBS_DASHBOARD, WEB_JOBS_DASHBOARD_ACCOUNT_NAME, WEB_JOBS_STORAGE,
    WEB_JOBS_STORAGE_ACCOUNT_NAME,
};
use super::fx_version::LinuxFxVersion;
use super::model::{
    AadAuthSettings, AppServiceLogs, ApplicationStack, AuthSettings, Backup, BackupSchedule, ClientCertMode,
    ConnectionString, Cors, DockerStack, Identity, IdentityType, IpRestriction, LinuxFunctionAppSlotModel,
    OAuthProvider, SiteConfig, SiteCredential,
};
use super::storage::{parse_key_vault_reference, parse_web_jobs_storage_string};
use crate::ids::{FunctionAppSlotId, ResourceId};
use crate::web::models::{
    self as wire, BackupRequest, ConnectionStringDictionary, ManagedServiceIdentity, Site, SiteAuthSettings,
    SiteLogsConfig, StringDictionary, User,
};
use std::collections::BTreeMap;

/// Everything Read fetched for one slot
#[derive(Debug, Clone, Default)]
pub struct RemoteSnapshot {
    pub site: Site,
    pub app_settings: StringDictionary,
    pub connection_strings: ConnectionStringDictionary,
    pub publishing_credentials: Option<User>,
    pub auth_settings: SiteAuthSettings,
    /// `None` when no backup is configured
    pub backup: Option<BackupRequest>,
    pub logs: SiteLogsConfig,
    pub site_config: Option<wire::SiteConfig>,
}

/// Build a fresh record from remote state
///
/// `prior` is the last recorded state, if any; it decides which
/// synthesized app settings are reported and supplies spellings for
/// values the service re-formats.
pub fn flatten(
    id: &FunctionAppSlotId,
    snapshot: &RemoteSnapshot,
    prior: Option<&LinuxFunctionAppSlotModel>,
) -> LinuxFunctionAppSlotModel {
    let site = &snapshot.site;
    let props = site.properties.clone().unwrap_or_default();

    let mut state = LinuxFunctionAppSlotModel {
        name: id.slot_name.clone(),
        function_app_id: id.parent().id(),
        enabled: props.enabled.unwrap_or_default(),
        https_only: props.https_only.unwrap_or_default(),
        client_certificate_enabled: props.client_cert_enabled.unwrap_or_default(),
        client_certificate_mode: props
            .client_cert_mode
            .as_deref()
            .map(ClientCertMode::from_api)
            .unwrap_or_default(),
        daily_memory_time_quota: props.daily_memory_time_quota.unwrap_or_default(),
        tags: site.tags.clone().unwrap_or_default(),
        kind: site.kind.clone().unwrap_or_default(),
        key_vault_reference_identity_id: flatten_key_vault_reference_identity(
            props.key_vault_reference_identity.as_deref(),
            prior,
        ),
        custom_domain_verification_id: props.custom_domain_verification_id.clone().unwrap_or_default(),
        default_hostname: props.default_host_name.clone().unwrap_or_default(),
        outbound_ip_addresses: props.outbound_ip_addresses.clone().unwrap_or_default(),
        outbound_ip_address_list: split_addresses(props.outbound_ip_addresses.as_deref()),
        possible_outbound_ip_addresses: props.possible_outbound_ip_addresses.clone().unwrap_or_default(),
        possible_outbound_ip_address_list: split_addresses(props.possible_outbound_ip_addresses.as_deref()),
        builtin_logging_enabled: false,
        functions_extension_version: String::new(),
        identity: flatten_identity(site.identity.as_ref(), prior.and_then(|p| p.identity.as_ref())),
        site_config: flatten_site_config(snapshot.site_config.as_ref().or(props.site_config.as_ref())),
        connection_strings: flatten_connection_strings(
            &snapshot.connection_strings,
            prior.map(|p| p.connection_strings.as_slice()),
        ),
        site_credential: snapshot.publishing_credentials.as_ref().and_then(flatten_site_credential),
        auth_settings: flatten_auth_settings(&snapshot.auth_settings),
        backup: flatten_backup(
            snapshot.backup.as_ref(),
            prior.and_then(|p| p.backup.as_ref()),
        ),
        ..Default::default()
    };

    if let Some(prior) = prior {
        state.content_share_force_disabled = prior.content_share_force_disabled;
    }

    unpack_app_settings(&mut state, &snapshot.app_settings, prior);
    state.site_config.app_service_logs = flatten_app_service_logs(&snapshot.logs);

    state
}

/// Lift reserved app settings into their fields; the rest become
/// `app_settings`
fn unpack_app_settings(
    state: &mut LinuxFunctionAppSlotModel,
    input: &StringDictionary,
    prior: Option<&LinuxFunctionAppSlotModel>,
) {
    let Some(properties) = &input.properties else {
        return;
    };

    let prior_has = |key: &str| prior.is_some_and(|p| p.app_settings.contains_key(key));
    let mut app_settings = BTreeMap::new();
    let mut docker = DockerStack::default();

    for (key, value) in properties {
        let value = value.clone().unwrap_or_default();
        match key.as_str() {
            FUNCTIONS_EXTENSION_VERSION => state.functions_extension_version = value,
            NODE_DEFAULT_VERSION | HTTP_LOGGING_RETENTION_DAYS => {}
            CONTENT_CONNECTION_STRING | CONTENT_SHARE | RUN_FROM_PACKAGE => {
                if prior_has(key) {
                    app_settings.insert(key.clone(), value);
                }
            }
            FUNCTIONS_WORKER_RUNTIME => {
                if state.site_config.application_stack.is_none() && value == "custom" {
                    state.site_config.application_stack = Some(ApplicationStack::CustomHandler);
                }
                if prior_has(key) {
                    app_settings.insert(key.clone(), value);
                }
            }
            DOCKER_REGISTRY_URL => docker.registry_url = value,
            DOCKER_REGISTRY_USERNAME => docker.registry_username = value,
            DOCKER_REGISTRY_PASSWORD => docker.registry_password = value,
            APP_INSIGHTS_KEY => state.site_config.application_insights_key = value,
            APP_INSIGHTS_CONNECTION_STRING => state.site_config.application_insights_connection_string = value,
            WEB_JOBS_STORAGE => {
                if let Some(secret_id) = parse_key_vault_reference(&value) {
                    state.storage_key_vault_secret_id = secret_id.to_string();
                } else {
                    let (name, key) = parse_web_jobs_storage_string(&value);
                    state.storage_account_name = name;
                    state.storage_account_access_key = key;
                }
            }
            WEB_JOBS_STORAGE_ACCOUNT_NAME => {
                state.storage_uses_managed_identity = true;
                state.storage_account_name = value;
            }
            WEB_JOBS_DASHBOARD | WEB_JOBS_DASHBOARD_ACCOUNT_NAME => state.builtin_logging_enabled = true,
            HEALTH_CHECK_MAX_PING_FAILURES => {
                state.site_config.health_check_eviction_time_in_min = value.parse().unwrap_or_default();
            }
            _ => {
                app_settings.insert(key.clone(), value);
            }
        }
    }

    if !docker.registry_url.is_empty() {
        let decoded = state
            .site_config
            .linux_fx_version
            .parse::<LinuxFxVersion>()
            .ok()
            .and_then(|fx| fx.into_stack(Some(&docker)));
        if let Some(stack @ ApplicationStack::Docker(_)) = decoded {
            state.site_config.application_stack = Some(stack);
        }
    }

    state.app_settings = app_settings;
}

fn flatten_site_config(input: Option<&wire::SiteConfig>) -> SiteConfig {
    let Some(config) = input else {
        return zero_site_config();
    };

    let linux_fx_version = config.linux_fx_version.clone().unwrap_or_default();
    let application_stack = match linux_fx_version.parse::<LinuxFxVersion>() {
        Ok(fx) => fx.into_stack(None),
        Err(e) => {
            tracing::warn!("ignoring unrecognised runtime: {}", e);
            None
        }
    };

    SiteConfig {
        always_on: config.always_on.unwrap_or_default(),
        api_definition_url: config
            .api_definition
            .as_ref()
            .and_then(|a| a.url.clone())
            .unwrap_or_default(),
        app_command_line: config.app_command_line.clone().unwrap_or_default(),
        app_scale_limit: config.function_app_scale_limit.unwrap_or_default(),
        application_insights_key: String::new(),
        application_insights_connection_string: String::new(),
        application_stack,
        app_service_logs: None,
        auto_swap_slot_name: config.auto_swap_slot_name.clone().unwrap_or_default(),
        cors: config.cors.as_ref().and_then(flatten_cors),
        default_documents: config.default_documents.clone().unwrap_or_default(),
        elastic_instance_minimum: config.minimum_elastic_instance_count.unwrap_or_default(),
        ftps_state: config.ftps_state.clone().unwrap_or_default(),
        health_check_path: config.health_check_path.clone().unwrap_or_default(),
        health_check_eviction_time_in_min: 0,
        http2_enabled: config.http20_enabled.unwrap_or_default(),
        ip_restriction: config
            .ip_security_restrictions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(flatten_ip_restriction)
            .collect(),
        load_balancing_mode: config.load_balancing.clone().unwrap_or_default(),
        managed_pipeline_mode: config.managed_pipeline_mode.clone().unwrap_or_default(),
        minimum_tls_version: config.min_tls_version.clone().unwrap_or_default(),
        scm_minimum_tls_version: config.scm_min_tls_version.clone().unwrap_or_default(),
        pre_warmed_instance_count: config.pre_warmed_instance_count.unwrap_or_default(),
        remote_debugging_enabled: config.remote_debugging_enabled.unwrap_or_default(),
        remote_debugging_version: config.remote_debugging_version.clone().unwrap_or_default(),
        runtime_scale_monitoring_enabled: config.functions_runtime_scale_monitoring_enabled.unwrap_or_default(),
        use_32_bit_worker: config.use_32_bit_worker_process.unwrap_or_default(),
        vnet_route_all_enabled: config.vnet_route_all_enabled.unwrap_or_default(),
        websockets_enabled: config.web_sockets_enabled.unwrap_or_default(),
        worker_count: config.number_of_workers.unwrap_or_default(),
        linux_fx_version,
        detailed_error_logging_enabled: config.detailed_error_logging_enabled.unwrap_or_default(),
    }
}

fn zero_site_config() -> SiteConfig {
    SiteConfig {
        ftps_state: String::new(),
        load_balancing_mode: String::new(),
        managed_pipeline_mode: String::new(),
        minimum_tls_version: String::new(),
        scm_minimum_tls_version: String::new(),
        ..Default::default()
    }
}

fn flatten_cors(cors: &wire::CorsSettings) -> Option<Cors> {
    let allowed_origins = cors.allowed_origins.clone().unwrap_or_default();
    let support_credentials = cors.support_credentials.unwrap_or_default();
    if allowed_origins.is_empty() && !support_credentials {
        return None;
    }
    Some(Cors {
        allowed_origins,
        support_credentials,
    })
}

fn flatten_ip_restriction(restriction: &wire::IpSecurityRestriction) -> IpRestriction {
    let address = restriction.ip_address.clone().unwrap_or_default();
    let is_service_tag = restriction
        .tag
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("ServiceTag"));
    let (ip_address, service_tag) = if is_service_tag {
        (String::new(), address)
    } else {
        (address, String::new())
    };
    IpRestriction {
        name: restriction.name.clone().unwrap_or_default(),
        ip_address,
        service_tag,
        virtual_network_subnet_id: restriction.vnet_subnet_resource_id.clone().unwrap_or_default(),
        priority: restriction.priority.unwrap_or_default(),
        action: restriction.action.clone().unwrap_or_default(),
    }
}

/// Connection strings, ordered as in `prior` with new entries by name
fn flatten_connection_strings(
    input: &ConnectionStringDictionary,
    prior: Option<&[ConnectionString]>,
) -> Vec<ConnectionString> {
    let Some(properties) = &input.properties else {
        return Vec::new();
    };
    let mut result: Vec<ConnectionString> = properties
        .iter()
        .map(|(name, pair)| ConnectionString {
            name: name.clone(),
            connection_type: pair.connection_type.clone(),
            value: pair.value.clone(),
        })
        .collect();

    let position = |name: &str| {
        prior
            .and_then(|p| p.iter().position(|c| c.name == name))
            .unwrap_or(usize::MAX)
    };
    result.sort_by(|a, b| position(&a.name).cmp(&position(&b.name)).then_with(|| a.name.cmp(&b.name)));
    result
}

fn flatten_site_credential(user: &User) -> Option<SiteCredential> {
    let props = user.properties.as_ref()?;
    Some(SiteCredential {
        name: props.publishing_user_name.clone().unwrap_or_default(),
        password: props.publishing_password.clone().unwrap_or_default(),
    })
}

fn flatten_auth_settings(input: &SiteAuthSettings) -> Option<AuthSettings> {
    let props = input.properties.as_ref()?;
    let enabled = props.enabled.unwrap_or_default();
    let has_provider = props.client_id.is_some()
        || props.facebook_app_id.is_some()
        || props.github_client_id.is_some()
        || props.google_client_id.is_some()
        || props.microsoft_account_client_id.is_some();
    if !enabled && !has_provider {
        return None;
    }

    let additional_login_parameters = props
        .additional_login_params
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| entry.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let provider = |id: &Option<String>, secret: &Option<String>, scopes: &Option<Vec<String>>| {
        id.as_ref().map(|client_id| OAuthProvider {
            client_id: client_id.clone(),
            client_secret: secret.clone().unwrap_or_default(),
            oauth_scopes: scopes.clone().unwrap_or_default(),
        })
    };

    Some(AuthSettings {
        enabled,
        additional_login_parameters,
        allowed_external_redirect_urls: props.allowed_external_redirect_urls.clone().unwrap_or_default(),
        default_provider: props.default_provider.clone().unwrap_or_default(),
        issuer: props.issuer.clone().unwrap_or_default(),
        runtime_version: props.runtime_version.clone().unwrap_or_default(),
        token_refresh_extension_hours: props.token_refresh_extension_hours.unwrap_or_default(),
        token_store_enabled: props.token_store_enabled.unwrap_or_default(),
        unauthenticated_client_action: props.unauthenticated_client_action.clone().unwrap_or_default(),
        active_directory: props.client_id.as_ref().map(|client_id| AadAuthSettings {
            client_id: client_id.clone(),
            client_secret: props.client_secret.clone().unwrap_or_default(),
            allowed_audiences: props.allowed_audiences.clone().unwrap_or_default(),
        }),
        facebook: provider(&props.facebook_app_id, &props.facebook_app_secret, &props.facebook_oauth_scopes),
        github: provider(&props.github_client_id, &props.github_client_secret, &props.github_oauth_scopes),
        google: provider(&props.google_client_id, &props.google_client_secret, &props.google_oauth_scopes),
        microsoft: provider(
            &props.microsoft_account_client_id,
            &props.microsoft_account_client_secret,
            &props.microsoft_account_oauth_scopes,
        ),
    })
}

fn flatten_backup(input: Option<&BackupRequest>, prior: Option<&Backup>) -> Option<Backup> {
    let props = input?.properties.as_ref()?;
    let schedule = props.backup_schedule.clone().unwrap_or_default();
    let prior_start = prior.map(|b| b.schedule.start_time.as_str());
    Some(Backup {
        name: props.backup_name.clone().unwrap_or_default(),
        enabled: props.enabled.unwrap_or_default(),
        storage_account_url: props.storage_account_url.clone(),
        schedule: BackupSchedule {
            frequency_interval: schedule.frequency_interval,
            frequency_unit: schedule.frequency_unit,
            keep_at_least_one_backup: schedule.keep_at_least_one_backup,
            retention_period_days: schedule.retention_period_in_days,
            start_time: normalize_timestamp(schedule.start_time.as_deref().unwrap_or_default(), prior_start),
            last_execution_time: schedule.last_execution_time.unwrap_or_default(),
        },
    })
}

/// Keep the prior spelling of a timestamp when both denote the same instant
fn normalize_timestamp(remote: &str, prior: Option<&str>) -> String {
    let Some(prior) = prior.filter(|p| !p.is_empty()) else {
        return remote.to_string();
    };
    match (
        chrono::DateTime::parse_from_rfc3339(remote),
        chrono::DateTime::parse_from_rfc3339(prior),
    ) {
        (Ok(r), Ok(p)) if r == p => prior.to_string(),
        _ => remote.to_string(),
    }
}

fn flatten_app_service_logs(input: &SiteLogsConfig) -> Option<AppServiceLogs> {
    let file_system = input.properties.as_ref()?.http_logs.as_ref()?.file_system.as_ref()?;
    if !file_system.enabled.unwrap_or_default() {
        return None;
    }
    Some(AppServiceLogs {
        disk_quota_mb: file_system.retention_in_mb.unwrap_or_default(),
        retention_period_days: file_system.retention_in_days.unwrap_or_default(),
    })
}

fn flatten_identity(input: Option<&ManagedServiceIdentity>, prior: Option<&Identity>) -> Option<Identity> {
    let identity = input?;
    let identity_type = IdentityType::from_api(&identity.identity_type)?;

    let identity_ids = identity
        .user_assigned_identities
        .as_ref()
        .map(|ids| {
            ids.keys()
                .map(|id| {
                    prior
                        .and_then(|p| p.identity_ids.iter().find(|known| known.eq_ignore_ascii_case(id)))
                        .cloned()
                        .unwrap_or_else(|| id.clone())
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Identity {
        identity_type,
        identity_ids,
        principal_id: identity.principal_id.clone().unwrap_or_default(),
        tenant_id: identity.tenant_id.clone().unwrap_or_default(),
    })
}

/// The service reports `SystemAssigned` when no identity was chosen
fn flatten_key_vault_reference_identity(remote: Option<&str>, prior: Option<&LinuxFunctionAppSlotModel>) -> String {
    let remote = remote.unwrap_or_default();
    let prior_value = prior.map(|p| p.key_vault_reference_identity_id.as_str()).unwrap_or_default();
    if remote.eq_ignore_ascii_case("SystemAssigned") && prior_value.is_empty() {
        return String::new();
    }
    if remote.eq_ignore_ascii_case(prior_value) {
        return prior_value.to_string();
    }
    remote.to_string()
}

fn split_addresses(input: Option<&str>) -> Vec<String> {
    input
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::models::{ConnStringValueTypePair, SiteProperties};

    fn slot_id() -> FunctionAppSlotId {
        FunctionAppSlotId::new("00000000-0000-0000-0000-000000000000", "rg", "app", "staging")
    }

    fn dictionary(pairs: &[(&str, &str)]) -> StringDictionary {
        StringDictionary {
            properties: Some(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), Some(v.to_string())))
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_absent_remote_fields_are_zero_values() {
        let state = flatten(&slot_id(), &RemoteSnapshot::default(), None);
        assert_eq!(state.name, "staging");
        assert_eq!(
            state.function_app_id,
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Web/sites/app"
        );
        assert!(!state.enabled);
        assert!(state.tags.is_empty());
        assert!(state.backup.is_none());
        assert!(state.auth_settings.is_none());
        assert!(state.site_config.application_stack.is_none());
        assert_eq!(state.functions_extension_version, "");
    }

    #[test]
    fn test_synthesized_settings_need_prior() {
        let snapshot = RemoteSnapshot {
            app_settings: dictionary(&[
                (CONTENT_SHARE, "staging-ab12"),
                (RUN_FROM_PACKAGE, "1"),
                ("CUSTOM", "x"),
            ]),
            ..Default::default()
        };

        let state = flatten(&slot_id(), &snapshot, None);
        assert_eq!(state.app_settings.len(), 1);
        assert_eq!(state.app_settings["CUSTOM"], "x");

        let mut prior = LinuxFunctionAppSlotModel::default();
        prior.app_settings.insert(RUN_FROM_PACKAGE.to_string(), "1".to_string());
        let state = flatten(&slot_id(), &snapshot, Some(&prior));
        assert_eq!(state.app_settings[RUN_FROM_PACKAGE], "1");
        assert!(!state.app_settings.contains_key(CONTENT_SHARE));
    }

    #[test]
    fn test_storage_settings_are_lifted() {
        let snapshot = RemoteSnapshot {
            app_settings: dictionary(&[
                (
                    WEB_JOBS_STORAGE,
                    "DefaultEndpointsProtocol=https;AccountName=acct1;AccountKey=k;EndpointSuffix=core.windows.net",
                ),
                (WEB_JOBS_DASHBOARD, "ignored"),
                (FUNCTIONS_EXTENSION_VERSION, "~4"),
                (HEALTH_CHECK_MAX_PING_FAILURES, "5"),
            ]),
            ..Default::default()
        };
        let state = flatten(&slot_id(), &snapshot, None);
        assert_eq!(state.storage_account_name, "acct1");
        assert_eq!(state.storage_account_access_key, "k");
        assert!(state.builtin_logging_enabled);
        assert_eq!(state.functions_extension_version, "~4");
        assert_eq!(state.site_config.health_check_eviction_time_in_min, 5);
        assert!(state.app_settings.is_empty());
    }

    #[test]
    fn test_managed_identity_storage() {
        let snapshot = RemoteSnapshot {
            app_settings: dictionary(&[
                (WEB_JOBS_STORAGE_ACCOUNT_NAME, "acct1"),
                (WEB_JOBS_DASHBOARD_ACCOUNT_NAME, "acct1"),
            ]),
            ..Default::default()
        };
        let state = flatten(&slot_id(), &snapshot, None);
        assert!(state.storage_uses_managed_identity);
        assert_eq!(state.storage_account_name, "acct1");
        assert!(state.builtin_logging_enabled);
    }

    #[test]
    fn test_custom_handler_from_worker_runtime() {
        let snapshot = RemoteSnapshot {
            app_settings: dictionary(&[(FUNCTIONS_WORKER_RUNTIME, "custom")]),
            ..Default::default()
        };
        let state = flatten(&slot_id(), &snapshot, None);
        assert_eq!(state.site_config.application_stack, Some(ApplicationStack::CustomHandler));
        assert!(state.app_settings.is_empty());
    }

    #[test]
    fn test_docker_stack_needs_registry_setting() {
        let snapshot = RemoteSnapshot {
            site_config: Some(wire::SiteConfig {
                linux_fx_version: Some("docker|myacr.azurecr.io/app:v1".to_string()),
                ..Default::default()
            }),
            app_settings: dictionary(&[(DOCKER_REGISTRY_URL, "https://myacr.azurecr.io")]),
            ..Default::default()
        };
        let state = flatten(&slot_id(), &snapshot, None);
        assert_eq!(
            state.site_config.application_stack,
            Some(ApplicationStack::Docker(DockerStack {
                registry_url: "https://myacr.azurecr.io".to_string(),
                image_name: "app".to_string(),
                image_tag: "v1".to_string(),
                ..Default::default()
            }))
        );
    }

    #[test]
    fn test_connection_strings_follow_prior_order() {
        let input = ConnectionStringDictionary {
            properties: Some(BTreeMap::from([
                (
                    "alpha".to_string(),
                    ConnStringValueTypePair {
                        value: "a".to_string(),
                        connection_type: "Custom".to_string(),
                    },
                ),
                (
                    "zulu".to_string(),
                    ConnStringValueTypePair {
                        value: "z".to_string(),
                        connection_type: "SQLAzure".to_string(),
                    },
                ),
            ])),
        };
        let prior = vec![
            ConnectionString {
                name: "zulu".to_string(),
                ..Default::default()
            },
            ConnectionString {
                name: "alpha".to_string(),
                ..Default::default()
            },
        ];
        let flattened = flatten_connection_strings(&input, Some(&prior));
        let names: Vec<_> = flattened.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["zulu", "alpha"]);
    }

    #[test]
    fn test_backup_timestamp_keeps_prior_format() {
        let backup = BackupRequest {
            properties: Some(wire::BackupRequestProperties {
                storage_account_url: "https://sa.blob.core.windows.net/c?sig".to_string(),
                backup_schedule: Some(wire::BackupSchedule {
                    start_time: Some("2024-01-01T00:00:00+00:00".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        };
        let mut prior = Backup::default();
        prior.schedule.start_time = "2024-01-01T00:00:00Z".to_string();

        let flattened = flatten_backup(Some(&backup), Some(&prior)).unwrap();
        assert_eq!(flattened.schedule.start_time, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_computed_attributes() {
        let snapshot = RemoteSnapshot {
            site: Site {
                kind: Some("functionapp,linux".to_string()),
                properties: Some(SiteProperties {
                    outbound_ip_addresses: Some("1.1.1.1,2.2.2.2".to_string()),
                    key_vault_reference_identity: Some("SystemAssigned".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            publishing_credentials: Some(User {
                properties: Some(wire::UserProperties {
                    publishing_user_name: Some("$app__staging".to_string()),
                    publishing_password: Some("pw".to_string()),
                }),
            }),
            ..Default::default()
        };
        let state = flatten(&slot_id(), &snapshot, None);
        assert_eq!(state.outbound_ip_address_list, vec!["1.1.1.1", "2.2.2.2"]);
        assert_eq!(state.key_vault_reference_identity_id, "");
        assert_eq!(state.site_credential.unwrap().name, "$app__staging");
    }
}
