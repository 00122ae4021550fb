//! Linux Function App Slot lifecycle
//!
//! Create, Read, Update and Delete for `azurerm_linux_function_app_slot`.
//! Each operation is a straight sequence of API calls; the first failure
//! ends the operation and is reported with the step that failed. Nothing is
//! rolled back, so a Create that fails after the slot PUT leaves the slot in
//! place with some sub-resources unconfigured.

use super::app_settings::{CONTENT_CONNECTION_STRING, CONTENT_SHARE};
use super::diff::{ChangeSet, Field};
use super::expand::{self, ExpandContext, SITE_KIND};
use super::flatten::{self, RemoteSnapshot};
use super::model::LinuxFunctionAppSlotModel;
use super::schema::{self, RESOURCE_TYPE};
use super::storage::{self, StorageConnection};
use crate::clients::Clients;
use crate::error::{ProviderError, ReadOutcome, Scope};
use crate::ids::{AppServiceEnvironmentId, FunctionAppId, FunctionAppSlotId, ResourceId, ServicePlanId};
use crate::resource::{ResourceDef, Resource, SchemaError, Timeouts};
use crate::web::models::{
    AppServicePlan, ConnectionStringDictionary, ResourceNameAvailabilityRequest, Site, SiteConfigResource,
    SiteProperties,
};
use crate::web::WebAppsClient;
use async_trait::async_trait;
use std::collections::BTreeMap;

const SITES_RESOURCE_TYPE: &str = "Microsoft.Web/sites";

/// Lifecycle adapter for Linux Function App slots
#[derive(Debug, Clone, Copy)]
pub struct LinuxFunctionAppSlot {
    schema: &'static ResourceDef,
}

impl LinuxFunctionAppSlot {
    /// Loads the field table and checks it against the record type
    pub fn new() -> Result<Self, SchemaError> {
        Ok(Self {
            schema: schema::load()?,
        })
    }

    pub fn schema(&self) -> &'static ResourceDef {
        self.schema
    }

    /// Resolve the plan a site runs on
    async fn service_plan(
        &self,
        clients: &Clients,
        scope: &Scope,
        site: &Site,
        step: &str,
    ) -> Result<(String, AppServicePlan), ProviderError> {
        let farm_id = site
            .properties
            .as_ref()
            .and_then(|p| p.server_farm_id.clone())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| scope.invalid(step, "could not determine the App Service Plan"))?;
        let plan_id = ServicePlanId::parse_insensitively(&farm_id)
            .map_err(|e| scope.invalid(step, e.to_string()))?;
        let plan = clients
            .service_plans
            .get(&plan_id)
            .await
            .map_err(scope.api("reading App Service Plan for"))?;
        Ok((farm_id, plan))
    }

    /// The slot's host name must be free. Plans inside an App Service
    /// Environment are checked by FQDN under the environment's DNS suffix.
    async fn check_name_availability(
        &self,
        clients: &Clients,
        scope: &Scope,
        id: &FunctionAppSlotId,
        plan: &AppServicePlan,
    ) -> Result<(), ProviderError> {
        let mut name = format!("{}-{}", id.site_name, id.slot_name);
        let mut is_fqdn = None;

        let ase_id = plan
            .properties
            .as_ref()
            .and_then(|p| p.hosting_environment_profile.as_ref())
            .and_then(|profile| profile.id.as_deref())
            .and_then(|ase| AppServiceEnvironmentId::parse_insensitively(ase).ok());

        if let Some(ase_id) = ase_id {
            let mut suffix = format!("{}.appserviceenvironment.net", ase_id.hosting_environment_name);
            match clients.environments.get(&ase_id).await {
                Ok(ase) => {
                    if let Some(dns_suffix) = ase
                        .properties
                        .and_then(|p| p.dns_suffix)
                        .filter(|s| !s.is_empty())
                    {
                        suffix = dns_suffix;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "could not read {} for {}, assuming DNS suffix {:?}: {}",
                        ase_id,
                        id,
                        suffix,
                        e
                    );
                }
            }
            name = format!("{}.{}", name, suffix);
            is_fqdn = Some(true);
        }

        let request = ResourceNameAvailabilityRequest {
            name: name.clone(),
            resource_type: SITES_RESOURCE_TYPE.to_string(),
            is_fqdn,
        };
        let availability = clients
            .web_apps
            .check_name_availability(&clients.subscription_id, &request)
            .await
            .map_err(scope.api("checking name availability for"))?;

        // Only an explicit refusal blocks the create
        if availability.name_available == Some(false) {
            return Err(scope.invalid(
                "checking name availability for",
                format!(
                    "the name {:?} is not available: {}",
                    name,
                    availability.message.unwrap_or_default()
                ),
            ));
        }
        Ok(())
    }

    /// Sub-resources configured after the slot itself exists
    async fn create_sub_resources(
        &self,
        clients: &Clients,
        scope: &Scope,
        id: &FunctionAppSlotId,
        desired: &LinuxFunctionAppSlotModel,
    ) -> Result<(), ProviderError> {
        if let Some(backup) = expand::expand_backup(desired.backup.as_ref()) {
            clients
                .web_apps
                .update_backup_configuration_slot(id, &backup)
                .await
                .map_err(scope.api("updating backup configuration for"))?;
        }

        if let Some(auth) = expand::expand_auth_settings(desired.auth_settings.as_ref()) {
            clients
                .web_apps
                .update_auth_settings_slot(id, &auth)
                .await
                .map_err(scope.api("updating auth settings for"))?;
        }

        if let Some(connection_strings) = expand::expand_connection_strings(&desired.connection_strings) {
            clients
                .web_apps
                .update_connection_strings_slot(id, &connection_strings)
                .await
                .map_err(scope.api("updating connection strings for"))?;
        }

        if let Some(logs) = desired.site_config.app_service_logs.as_ref() {
            clients
                .web_apps
                .update_diagnostic_logs_config_slot(id, &expand::expand_app_service_logs(Some(logs)))
                .await
                .map_err(scope.api("updating logs configuration for"))?;
        }

        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[async_trait]
impl Resource for LinuxFunctionAppSlot {
    type Model = LinuxFunctionAppSlotModel;
    type Id = FunctionAppSlotId;
    type Changes = ChangeSet;

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn planned_id(&self, desired: &LinuxFunctionAppSlotModel) -> String {
        format!("{}/slots/{}", desired.function_app_id, desired.name)
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::from(&self.schema.timeouts)
    }

    fn validate(&self, desired: &LinuxFunctionAppSlotModel) -> Result<(), ProviderError> {
        schema::validate_model(self.schema, desired).map_err(|source| ProviderError::Validation {
            resource: RESOURCE_TYPE,
            source,
        })
    }

    fn diff(&self, prior: &LinuxFunctionAppSlotModel, desired: &LinuxFunctionAppSlotModel) -> ChangeSet {
        ChangeSet::between(prior, desired)
    }

    async fn create(
        &self,
        clients: &Clients,
        desired: &LinuxFunctionAppSlotModel,
    ) -> Result<FunctionAppSlotId, ProviderError> {
        self.validate(desired)?;

        let parent_id = FunctionAppId::parse(&desired.function_app_id).map_err(|source| {
            ProviderError::InvalidId {
                resource: RESOURCE_TYPE,
                source,
            }
        })?;
        let id = parent_id.slot(&desired.name);
        let scope = Scope::new(RESOURCE_TYPE, &id);
        tracing::info!("creating {}", id);

        let parent = clients
            .web_apps
            .get(&parent_id)
            .await
            .map_err(scope.api("reading parent Function App for"))?;
        let location = parent
            .location
            .clone()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| scope.invalid("reading parent Function App for", "could not determine location"))?;

        let (server_farm_id, plan) = self
            .service_plan(clients, &scope, &parent, "reading parent Function App for")
            .await?;
        let tier = plan
            .sku
            .as_ref()
            .and_then(|s| s.tier.as_deref())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| scope.invalid("reading App Service Plan for", "could not determine the SKU tier"))?;
        let send_content_settings =
            !desired.content_share_force_disabled && storage::tier_supports_content_share(tier);

        match clients.web_apps.get_slot(&id).await {
            Ok(_) => return Err(scope.requires_import(id.id())),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(scope.api("checking for presence of existing")(e)),
        }

        self.check_name_availability(clients, &scope, &id, &plan).await?;

        let storage = StorageConnection::from_model(desired, &clients.storage_endpoint_suffix);
        let ctx = ExpandContext {
            functions_extension_version: &desired.functions_extension_version,
            storage: &storage,
        };
        let user_settings = expand::create_app_settings(desired, &storage, send_content_settings);
        let site_config = expand::expand_with_user_settings(desired, None, &ctx, &user_settings);

        let site = Site {
            location: Some(location),
            tags: Some(desired.tags.clone()),
            kind: Some(SITE_KIND.to_string()),
            identity: Some(expand::expand_identity(desired.identity.as_ref())),
            properties: Some(SiteProperties {
                server_farm_id: Some(server_farm_id),
                enabled: Some(desired.enabled),
                https_only: Some(desired.https_only),
                client_cert_enabled: Some(desired.client_certificate_enabled),
                client_cert_mode: Some(desired.client_certificate_mode.as_str().to_string()),
                daily_memory_time_quota: Some(desired.daily_memory_time_quota),
                key_vault_reference_identity: non_empty(&desired.key_vault_reference_identity_id),
                site_config: Some(site_config),
                ..Default::default()
            }),
            ..Default::default()
        };

        let pending = clients
            .web_apps
            .create_or_update_slot(&id, &site)
            .await
            .map_err(scope.api("creating"))?;
        clients
            .poller
            .wait(&pending)
            .await
            .map_err(scope.wait("creation"))?;

        self.create_sub_resources(clients, &scope, &id, desired).await?;

        tracing::info!("created {}", id);
        Ok(id)
    }

    async fn read(
        &self,
        clients: &Clients,
        id: &FunctionAppSlotId,
        prior: Option<&LinuxFunctionAppSlotModel>,
    ) -> Result<ReadOutcome<LinuxFunctionAppSlotModel>, ProviderError> {
        let scope = Scope::new(RESOURCE_TYPE, id);
        let web_apps = &clients.web_apps;

        let site = match web_apps.get_slot(id).await {
            Ok(site) => site,
            Err(e) if e.is_not_found() => {
                tracing::info!("{} was not found, removing from state", id);
                return Ok(ReadOutcome::Gone);
            }
            Err(e) => return Err(scope.api("reading")(e)),
        };
        if site.properties.is_none() {
            return Err(scope.invalid("reading", "the response contained no properties"));
        }

        let app_settings = web_apps
            .list_application_settings_slot(id)
            .await
            .map_err(scope.api("reading app settings for"))?;
        let connection_strings = web_apps
            .list_connection_strings_slot(id)
            .await
            .map_err(scope.api("reading connection strings for"))?;

        let pending = web_apps
            .list_publishing_credentials_slot(id)
            .await
            .map_err(scope.api("listing publishing credentials for"))?;
        let completed = clients
            .poller
            .wait(&pending)
            .await
            .map_err(scope.wait("publishing credentials"))?;
        let publishing_credentials = WebAppsClient::publishing_credentials(&completed)
            .map_err(scope.api("reading publishing credentials for"))?;

        let auth_settings = web_apps
            .get_auth_settings_slot(id)
            .await
            .map_err(scope.api("reading auth settings for"))?;

        let backup = match web_apps.get_backup_configuration_slot(id).await {
            Ok(backup) => Some(backup),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(scope.api("reading backup configuration for")(e)),
        };

        let logs = web_apps
            .get_diagnostic_logs_configuration_slot(id)
            .await
            .map_err(scope.api("reading logs configuration for"))?;
        let site_config = web_apps
            .get_configuration_slot(id)
            .await
            .map_err(scope.api("reading site configuration for"))?;

        let snapshot = RemoteSnapshot {
            site,
            app_settings,
            connection_strings,
            publishing_credentials,
            auth_settings,
            backup,
            logs,
            site_config: site_config.properties,
        };
        Ok(ReadOutcome::Present(flatten::flatten(id, &snapshot, prior)))
    }

    async fn update(
        &self,
        clients: &Clients,
        id: &FunctionAppSlotId,
        desired: &LinuxFunctionAppSlotModel,
        changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        self.validate(desired)?;
        let scope = Scope::new(RESOURCE_TYPE, id);
        tracing::info!(
            "updating {} ({})",
            id,
            changes.iter().map(|f| f.path()).collect::<Vec<_>>().join(", ")
        );

        let mut existing = clients
            .web_apps
            .get_slot(id)
            .await
            .map_err(scope.api("reading"))?;
        if existing.properties.is_none() {
            return Err(scope.invalid("reading", "the response contained no properties"));
        }

        let (_, plan) = self.service_plan(clients, &scope, &existing, "reading").await?;
        let sku_name = plan
            .sku
            .as_ref()
            .and_then(|s| s.name.clone())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| scope.invalid("reading App Service Plan for", "could not determine the SKU"))?;

        if changes.has(Field::Tags) {
            existing.tags = Some(desired.tags.clone());
        }
        if changes.has(Field::Identity) {
            existing.identity = Some(expand::expand_identity(desired.identity.as_ref()));
        }

        let storage = StorageConnection::from_model(desired, &clients.storage_endpoint_suffix);
        let mut user_settings: BTreeMap<String, String> = desired.app_settings.clone();

        // Content share settings cannot change once set, except on Elastic Premium
        if !storage::plan_is_elastic(&sku_name) {
            let remote = clients
                .web_apps
                .list_application_settings_slot(id)
                .await
                .map_err(scope.api("reading app settings for"))?;
            let remote = remote.properties.unwrap_or_default();
            for key in [CONTENT_SHARE, CONTENT_CONNECTION_STRING] {
                if let Some(Some(value)) = remote.get(key) {
                    user_settings
                        .entry(key.to_string())
                        .or_insert_with(|| value.clone());
                }
            }
        }
        if desired.builtin_logging_enabled {
            let (key, value) = expand::builtin_logging_setting(&storage);
            user_settings.insert(key.to_string(), value);
        }

        let ctx = ExpandContext {
            functions_extension_version: &desired.functions_extension_version,
            storage: &storage,
        };

        let site_config = {
            let props = existing.properties.get_or_insert_with(SiteProperties::default);
            if changes.has(Field::Enabled) {
                props.enabled = Some(desired.enabled);
            }
            if changes.has(Field::HttpsOnly) {
                props.https_only = Some(desired.https_only);
            }
            if changes.has(Field::ClientCertificateEnabled) {
                props.client_cert_enabled = Some(desired.client_certificate_enabled);
            }
            if changes.has(Field::ClientCertificateMode) {
                props.client_cert_mode = Some(desired.client_certificate_mode.as_str().to_string());
            }
            if changes.has(Field::DailyMemoryTimeQuota) {
                props.daily_memory_time_quota = Some(desired.daily_memory_time_quota);
            }
            if changes.has(Field::KeyVaultReferenceIdentityId) {
                props.key_vault_reference_identity = non_empty(&desired.key_vault_reference_identity_id);
            }

            let site_config =
                expand::expand_with_user_settings(desired, props.site_config.as_ref(), &ctx, &user_settings);
            if changes.has(Field::SiteConfig) {
                props.site_config = Some(site_config.clone());
            }
            let target = props.site_config.get_or_insert_with(Default::default);
            if changes.has(Field::ApplicationStack) {
                target.linux_fx_version = site_config.linux_fx_version.clone();
            }
            target.app_settings = site_config.app_settings.clone();
            site_config
        };

        let pending = clients
            .web_apps
            .create_or_update_slot(id, &existing)
            .await
            .map_err(scope.api("updating"))?;
        clients
            .poller
            .wait(&pending)
            .await
            .map_err(scope.wait("update"))?;

        clients
            .web_apps
            .update_configuration_slot(
                id,
                &SiteConfigResource {
                    properties: Some(site_config),
                },
            )
            .await
            .map_err(scope.api("updating site configuration for"))?;

        if changes.has(Field::ConnectionStrings) {
            let connection_strings = expand::expand_connection_strings(&desired.connection_strings)
                .unwrap_or_else(|| ConnectionStringDictionary {
                    properties: Some(BTreeMap::new()),
                });
            clients
                .web_apps
                .update_connection_strings_slot(id, &connection_strings)
                .await
                .map_err(scope.api("updating connection strings for"))?;
        }

        if changes.has(Field::AuthSettings) {
            let auth = expand::expand_auth_settings(desired.auth_settings.as_ref())
                .unwrap_or_else(expand::disabled_auth_settings);
            clients
                .web_apps
                .update_auth_settings_slot(id, &auth)
                .await
                .map_err(scope.api("updating auth settings for"))?;
        }

        if changes.has(Field::Backup) {
            match expand::expand_backup(desired.backup.as_ref()) {
                Some(backup) => {
                    clients
                        .web_apps
                        .update_backup_configuration_slot(id, &backup)
                        .await
                        .map_err(scope.api("updating backup configuration for"))?;
                }
                None => {
                    clients
                        .web_apps
                        .delete_backup_configuration_slot(id)
                        .await
                        .map_err(scope.api("removing backup configuration for"))?;
                }
            }
        }

        if changes.has(Field::AppServiceLogs) {
            clients
                .web_apps
                .update_diagnostic_logs_config_slot(
                    id,
                    &expand::expand_app_service_logs(desired.site_config.app_service_logs.as_ref()),
                )
                .await
                .map_err(scope.api("updating logs configuration for"))?;
        }

        tracing::info!("updated {}", id);
        Ok(())
    }

    async fn delete(&self, clients: &Clients, id: &FunctionAppSlotId) -> Result<(), ProviderError> {
        let scope = Scope::new(RESOURCE_TYPE, id);
        tracing::info!("deleting {}", id);
        clients
            .web_apps
            .delete_slot(id, true, false)
            .await
            .map_err(scope.api("deleting"))
    }
}
