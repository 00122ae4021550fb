//! Desired-state record for a Linux Function App Slot
//!
//! Field names match the user-facing schema (see the embedded field table in
//! `resources/app_service.json`). Defaults are applied by serde so a record
//! decoded from a sparse YAML file carries the same values the schema
//! advertises.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Client certificate requirement for incoming requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientCertMode {
    Required,
    #[default]
    Optional,
    OptionalInteractiveUser,
}

impl ClientCertMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientCertMode::Required => "Required",
            ClientCertMode::Optional => "Optional",
            ClientCertMode::OptionalInteractiveUser => "OptionalInteractiveUser",
        }
    }

    /// Parse the API's value; unknown values fall back to `Optional`
    pub fn from_api(value: &str) -> Self {
        match value {
            v if v.eq_ignore_ascii_case("Required") => ClientCertMode::Required,
            v if v.eq_ignore_ascii_case("OptionalInteractiveUser") => ClientCertMode::OptionalInteractiveUser,
            _ => ClientCertMode::Optional,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinuxFunctionAppSlotModel {
    pub name: String,
    pub function_app_id: String,
    pub storage_account_name: String,
    pub storage_account_access_key: String,
    pub storage_uses_managed_identity: bool,
    pub storage_key_vault_secret_id: String,
    pub app_settings: BTreeMap<String, String>,
    pub auth_settings: Option<AuthSettings>,
    pub backup: Option<Backup>,
    pub builtin_logging_enabled: bool,
    pub client_certificate_enabled: bool,
    pub client_certificate_mode: ClientCertMode,
    pub connection_strings: Vec<ConnectionString>,
    pub daily_memory_time_quota: i32,
    pub enabled: bool,
    pub functions_extension_version: String,
    pub content_share_force_disabled: bool,
    pub https_only: bool,
    pub identity: Option<Identity>,
    pub key_vault_reference_identity_id: String,
    pub site_config: SiteConfig,
    pub tags: BTreeMap<String, String>,

    // Computed
    pub custom_domain_verification_id: String,
    pub default_hostname: String,
    pub kind: String,
    pub outbound_ip_addresses: String,
    pub outbound_ip_address_list: Vec<String>,
    pub possible_outbound_ip_addresses: String,
    pub possible_outbound_ip_address_list: Vec<String>,
    pub site_credential: Option<SiteCredential>,
}

impl Default for LinuxFunctionAppSlotModel {
    fn default() -> Self {
        Self {
            name: String::new(),
            function_app_id: String::new(),
            storage_account_name: String::new(),
            storage_account_access_key: String::new(),
            storage_uses_managed_identity: false,
            storage_key_vault_secret_id: String::new(),
            app_settings: BTreeMap::new(),
            auth_settings: None,
            backup: None,
            builtin_logging_enabled: true,
            client_certificate_enabled: false,
            client_certificate_mode: ClientCertMode::Optional,
            connection_strings: Vec::new(),
            daily_memory_time_quota: 0,
            enabled: true,
            functions_extension_version: "~4".to_string(),
            content_share_force_disabled: false,
            https_only: false,
            identity: None,
            key_vault_reference_identity_id: String::new(),
            site_config: SiteConfig::default(),
            tags: BTreeMap::new(),
            custom_domain_verification_id: String::new(),
            default_hostname: String::new(),
            kind: String::new(),
            outbound_ip_addresses: String::new(),
            outbound_ip_address_list: Vec::new(),
            possible_outbound_ip_addresses: String::new(),
            possible_outbound_ip_address_list: Vec::new(),
            site_credential: None,
        }
    }
}

impl LinuxFunctionAppSlotModel {
    /// Clear every computed attribute, leaving only user configuration
    pub fn without_computed(mut self) -> Self {
        self.custom_domain_verification_id.clear();
        self.default_hostname.clear();
        self.kind.clear();
        self.outbound_ip_addresses.clear();
        self.outbound_ip_address_list.clear();
        self.possible_outbound_ip_addresses.clear();
        self.possible_outbound_ip_address_list.clear();
        self.site_credential = None;
        self.site_config.linux_fx_version.clear();
        self.site_config.detailed_error_logging_enabled = false;
        if let Some(identity) = self.identity.as_mut() {
            identity.principal_id.clear();
            identity.tenant_id.clear();
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub always_on: bool,
    pub api_definition_url: String,
    pub app_command_line: String,
    pub app_scale_limit: i32,
    pub application_insights_key: String,
    pub application_insights_connection_string: String,
    pub application_stack: Option<ApplicationStack>,
    pub app_service_logs: Option<AppServiceLogs>,
    pub auto_swap_slot_name: String,
    pub cors: Option<Cors>,
    pub default_documents: Vec<String>,
    pub elastic_instance_minimum: i32,
    pub ftps_state: String,
    pub health_check_path: String,
    pub health_check_eviction_time_in_min: i32,
    pub http2_enabled: bool,
    pub ip_restriction: Vec<IpRestriction>,
    pub load_balancing_mode: String,
    pub managed_pipeline_mode: String,
    pub minimum_tls_version: String,
    pub scm_minimum_tls_version: String,
    pub pre_warmed_instance_count: i32,
    pub remote_debugging_enabled: bool,
    pub remote_debugging_version: String,
    pub runtime_scale_monitoring_enabled: bool,
    pub use_32_bit_worker: bool,
    pub vnet_route_all_enabled: bool,
    pub websockets_enabled: bool,
    pub worker_count: i32,

    // Computed
    pub linux_fx_version: String,
    pub detailed_error_logging_enabled: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            always_on: false,
            api_definition_url: String::new(),
            app_command_line: String::new(),
            app_scale_limit: 0,
            application_insights_key: String::new(),
            application_insights_connection_string: String::new(),
            application_stack: None,
            app_service_logs: None,
            auto_swap_slot_name: String::new(),
            cors: None,
            default_documents: Vec::new(),
            elastic_instance_minimum: 0,
            ftps_state: "Disabled".to_string(),
            health_check_path: String::new(),
            health_check_eviction_time_in_min: 0,
            http2_enabled: false,
            ip_restriction: Vec::new(),
            load_balancing_mode: "LeastRequests".to_string(),
            managed_pipeline_mode: "Integrated".to_string(),
            minimum_tls_version: "1.2".to_string(),
            scm_minimum_tls_version: "1.2".to_string(),
            pre_warmed_instance_count: 0,
            remote_debugging_enabled: false,
            remote_debugging_version: String::new(),
            runtime_scale_monitoring_enabled: false,
            use_32_bit_worker: false,
            vnet_route_all_enabled: false,
            websockets_enabled: false,
            worker_count: 0,
            linux_fx_version: String::new(),
            detailed_error_logging_enabled: false,
        }
    }
}

/// The language runtime or container the slot runs
///
/// Exactly one stack can be selected; it is packed into the API's
/// `linuxFxVersion` string by [`crate::appservice::fx_version`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStack {
    Dotnet {
        version: String,
        #[serde(default)]
        isolated: bool,
    },
    Node {
        version: String,
    },
    Python {
        version: String,
    },
    Java {
        version: String,
    },
    PowershellCore {
        version: String,
    },
    Docker(DockerStack),
    CustomHandler,
}

impl ApplicationStack {
    /// Value of the `FUNCTIONS_WORKER_RUNTIME` app setting for this stack
    pub fn worker_runtime(&self) -> Option<&'static str> {
        match self {
            ApplicationStack::Dotnet { isolated: false, .. } => Some("dotnet"),
            ApplicationStack::Dotnet { isolated: true, .. } => Some("dotnet-isolated"),
            ApplicationStack::Node { .. } => Some("node"),
            ApplicationStack::Python { .. } => Some("python"),
            ApplicationStack::Java { .. } => Some("java"),
            ApplicationStack::PowershellCore { .. } => Some("powershell"),
            ApplicationStack::CustomHandler => Some("custom"),
            ApplicationStack::Docker(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerStack {
    pub registry_url: String,
    pub image_name: String,
    pub image_tag: String,
    pub registry_username: String,
    pub registry_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
    pub support_credentials: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpRestriction {
    pub name: String,
    pub ip_address: String,
    pub service_tag: String,
    pub virtual_network_subnet_id: String,
    pub priority: i32,
    pub action: String,
}

impl Default for IpRestriction {
    fn default() -> Self {
        Self {
            name: String::new(),
            ip_address: String::new(),
            service_tag: String::new(),
            virtual_network_subnet_id: String::new(),
            priority: 65000,
            action: "Allow".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppServiceLogs {
    pub disk_quota_mb: i32,
    pub retention_period_days: i32,
}

impl Default for AppServiceLogs {
    fn default() -> Self {
        Self {
            disk_quota_mb: 35,
            retention_period_days: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionString {
    pub name: String,
    /// `MySql`, `SQLServer`, `SQLAzure`, `Custom`, `NotificationHub`, ...
    #[serde(rename = "type")]
    pub connection_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub enabled: bool,
    pub additional_login_parameters: BTreeMap<String, String>,
    pub allowed_external_redirect_urls: Vec<String>,
    pub default_provider: String,
    pub issuer: String,
    pub runtime_version: String,
    pub token_refresh_extension_hours: f64,
    pub token_store_enabled: bool,
    pub unauthenticated_client_action: String,
    pub active_directory: Option<AadAuthSettings>,
    pub facebook: Option<OAuthProvider>,
    pub github: Option<OAuthProvider>,
    pub google: Option<OAuthProvider>,
    pub microsoft: Option<OAuthProvider>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            additional_login_parameters: BTreeMap::new(),
            allowed_external_redirect_urls: Vec::new(),
            default_provider: String::new(),
            issuer: String::new(),
            runtime_version: String::new(),
            token_refresh_extension_hours: 72.0,
            token_store_enabled: false,
            unauthenticated_client_action: String::new(),
            active_directory: None,
            facebook: None,
            github: None,
            google: None,
            microsoft: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AadAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub allowed_audiences: Vec<String>,
}

/// Client credentials for a social login provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthProvider {
    pub client_id: String,
    pub client_secret: String,
    pub oauth_scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backup {
    pub name: String,
    pub enabled: bool,
    pub storage_account_url: String,
    pub schedule: BackupSchedule,
}

impl Default for Backup {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            storage_account_url: String::new(),
            schedule: BackupSchedule::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSchedule {
    pub frequency_interval: i32,
    /// `Day` or `Hour`
    pub frequency_unit: String,
    pub keep_at_least_one_backup: bool,
    pub retention_period_days: i32,
    /// RFC 3339
    pub start_time: String,
    // Computed
    pub last_execution_time: String,
}

impl Default for BackupSchedule {
    fn default() -> Self {
        Self {
            frequency_interval: 0,
            frequency_unit: String::new(),
            keep_at_least_one_backup: false,
            retention_period_days: 30,
            start_time: String::new(),
            last_execution_time: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityType {
    SystemAssigned,
    UserAssigned,
    #[serde(rename = "SystemAssigned, UserAssigned")]
    SystemAssignedUserAssigned,
}

impl IdentityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityType::SystemAssigned => "SystemAssigned",
            IdentityType::UserAssigned => "UserAssigned",
            IdentityType::SystemAssignedUserAssigned => "SystemAssigned, UserAssigned",
        }
    }

    /// Parse the API's spelling; `None` means no identity
    pub fn from_api(value: &str) -> Option<Self> {
        let normalized: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        match normalized.to_ascii_lowercase().as_str() {
            "systemassigned" => Some(IdentityType::SystemAssigned),
            "userassigned" => Some(IdentityType::UserAssigned),
            "systemassigned,userassigned" => Some(IdentityType::SystemAssignedUserAssigned),
            _ => None,
        }
    }

    pub fn has_user_assigned(&self) -> bool {
        matches!(self, IdentityType::UserAssigned | IdentityType::SystemAssignedUserAssigned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "type")]
    pub identity_type: IdentityType,
    #[serde(default)]
    pub identity_ids: Vec<String>,
    // Computed
    #[serde(default)]
    pub principal_id: String,
    #[serde(default)]
    pub tenant_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteCredential {
    pub name: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_sparse_yaml() {
        let yaml = r#"
name: staging
function_app_id: /subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Web/sites/app
storage_account_name: acct1
storage_account_access_key: key
site_config:
  application_stack:
    node:
      version: "18"
"#;
        let model: LinuxFunctionAppSlotModel = serde_yaml::from_str(yaml).unwrap();
        assert!(model.enabled);
        assert!(model.builtin_logging_enabled);
        assert_eq!(model.functions_extension_version, "~4");
        assert_eq!(model.client_certificate_mode, ClientCertMode::Optional);
        assert_eq!(model.site_config.minimum_tls_version, "1.2");
        assert_eq!(
            model.site_config.application_stack,
            Some(ApplicationStack::Node {
                version: "18".to_string()
            })
        );
    }

    #[test]
    fn test_custom_handler_is_a_bare_tag() {
        let stack: ApplicationStack = serde_yaml::from_str("custom_handler").unwrap();
        assert_eq!(stack, ApplicationStack::CustomHandler);
        assert_eq!(stack.worker_runtime(), Some("custom"));
    }

    #[test]
    fn test_identity_type_from_api() {
        assert_eq!(
            IdentityType::from_api("SystemAssigned, UserAssigned"),
            Some(IdentityType::SystemAssignedUserAssigned)
        );
        assert_eq!(IdentityType::from_api("None"), None);
    }
}
