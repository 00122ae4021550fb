//! `WebApps` operations used by Function App slots

use super::models::{
    BackupRequest, ConnectionStringDictionary, ResourceNameAvailability, ResourceNameAvailabilityRequest, Site,
    SiteAuthSettings, SiteConfigResource, SiteLogsConfig, StringDictionary, User,
};
use crate::arm::codec::{self, ApiError, Codec, Operation};
use crate::arm::http::ArmResponse;
use crate::ids::{FunctionAppId, FunctionAppSlotId, ResourceId};
use reqwest::Method;

const CLIENT: &str = "web.WebAppsClient";

const GET: Operation = Operation {
    client: CLIENT,
    name: "Get",
    method: Method::GET,
    suffix: "",
    expected: &[200],
};

const GET_SLOT: Operation = Operation {
    client: CLIENT,
    name: "GetSlot",
    method: Method::GET,
    suffix: "",
    expected: &[200],
};

const CREATE_OR_UPDATE_SLOT: Operation = Operation {
    client: CLIENT,
    name: "CreateOrUpdateSlot",
    method: Method::PUT,
    suffix: "",
    expected: &[200, 201, 202],
};

const DELETE_SLOT: Operation = Operation {
    client: CLIENT,
    name: "DeleteSlot",
    method: Method::DELETE,
    suffix: "",
    expected: &[200, 204],
};

const CHECK_NAME_AVAILABILITY: Operation = Operation {
    client: CLIENT,
    name: "CheckNameAvailability",
    method: Method::POST,
    suffix: "/providers/Microsoft.Web/checknameavailability",
    expected: &[200],
};

const LIST_APPLICATION_SETTINGS_SLOT: Operation = Operation {
    client: CLIENT,
    name: "ListApplicationSettingsSlot",
    method: Method::POST,
    suffix: "/config/appsettings/list",
    expected: &[200],
};

const LIST_CONNECTION_STRINGS_SLOT: Operation = Operation {
    client: CLIENT,
    name: "ListConnectionStringsSlot",
    method: Method::POST,
    suffix: "/config/connectionstrings/list",
    expected: &[200],
};

const UPDATE_CONNECTION_STRINGS_SLOT: Operation = Operation {
    client: CLIENT,
    name: "UpdateConnectionStringsSlot",
    method: Method::PUT,
    suffix: "/config/connectionstrings",
    expected: &[200],
};

const LIST_PUBLISHING_CREDENTIALS_SLOT: Operation = Operation {
    client: CLIENT,
    name: "ListPublishingCredentialsSlot",
    method: Method::POST,
    suffix: "/config/publishingcredentials/list",
    expected: &[200, 202],
};

const GET_AUTH_SETTINGS_SLOT: Operation = Operation {
    client: CLIENT,
    name: "GetAuthSettingsSlot",
    method: Method::POST,
    suffix: "/config/authsettings/list",
    expected: &[200],
};

const UPDATE_AUTH_SETTINGS_SLOT: Operation = Operation {
    client: CLIENT,
    name: "UpdateAuthSettingsSlot",
    method: Method::PUT,
    suffix: "/config/authsettings",
    expected: &[200],
};

const GET_BACKUP_CONFIGURATION_SLOT: Operation = Operation {
    client: CLIENT,
    name: "GetBackupConfigurationSlot",
    method: Method::POST,
    suffix: "/config/backup/list",
    expected: &[200],
};

const UPDATE_BACKUP_CONFIGURATION_SLOT: Operation = Operation {
    client: CLIENT,
    name: "UpdateBackupConfigurationSlot",
    method: Method::PUT,
    suffix: "/config/backup",
    expected: &[200],
};

const DELETE_BACKUP_CONFIGURATION_SLOT: Operation = Operation {
    client: CLIENT,
    name: "DeleteBackupConfigurationSlot",
    method: Method::DELETE,
    suffix: "/config/backup",
    expected: &[200],
};

const GET_DIAGNOSTIC_LOGS_CONFIGURATION_SLOT: Operation = Operation {
    client: CLIENT,
    name: "GetDiagnosticLogsConfigurationSlot",
    method: Method::GET,
    suffix: "/config/logs",
    expected: &[200],
};

const UPDATE_DIAGNOSTIC_LOGS_CONFIG_SLOT: Operation = Operation {
    client: CLIENT,
    name: "UpdateDiagnosticLogsConfigSlot",
    method: Method::PUT,
    suffix: "/config/logs",
    expected: &[200],
};

const GET_CONFIGURATION_SLOT: Operation = Operation {
    client: CLIENT,
    name: "GetConfigurationSlot",
    method: Method::GET,
    suffix: "/config/web",
    expected: &[200],
};

const UPDATE_CONFIGURATION_SLOT: Operation = Operation {
    client: CLIENT,
    name: "UpdateConfigurationSlot",
    method: Method::PUT,
    suffix: "/config/web",
    expected: &[200],
};

/// Client for `Microsoft.Web/sites` and its slots
#[derive(Clone, Debug)]
pub struct WebAppsClient {
    codec: Codec,
}

impl WebAppsClient {
    pub fn new(codec: Codec) -> Self {
        Self { codec }
    }

    pub async fn get(&self, id: &FunctionAppId) -> Result<Site, ApiError> {
        self.codec.execute_model(&GET, &id.id(), None, &[]).await
    }

    pub async fn get_slot(&self, id: &FunctionAppSlotId) -> Result<Site, ApiError> {
        self.codec.execute_model(&GET_SLOT, &id.id(), None, &[]).await
    }

    /// Starts the PUT; the returned response feeds the poller
    pub async fn create_or_update_slot(&self, id: &FunctionAppSlotId, site: &Site) -> Result<ArmResponse, ApiError> {
        let body = Codec::encode(&CREATE_OR_UPDATE_SLOT, site)?;
        self.codec
            .execute(&CREATE_OR_UPDATE_SLOT, &id.id(), Some(body), &[])
            .await
    }

    pub async fn delete_slot(
        &self,
        id: &FunctionAppSlotId,
        delete_metrics: bool,
        delete_empty_server_farm: bool,
    ) -> Result<(), ApiError> {
        let delete_metrics = delete_metrics.to_string();
        let delete_empty_server_farm = delete_empty_server_farm.to_string();
        self.codec
            .execute(
                &DELETE_SLOT,
                &id.id(),
                None,
                &[
                    ("deleteMetrics", &delete_metrics),
                    ("deleteEmptyServerFarm", &delete_empty_server_farm),
                ],
            )
            .await
            .map(|_| ())
    }

    pub async fn check_name_availability(
        &self,
        subscription_id: &str,
        request: &ResourceNameAvailabilityRequest,
    ) -> Result<ResourceNameAvailability, ApiError> {
        let body = Codec::encode(&CHECK_NAME_AVAILABILITY, request)?;
        self.codec
            .execute_model(
                &CHECK_NAME_AVAILABILITY,
                &format!("/subscriptions/{}", subscription_id),
                Some(body),
                &[],
            )
            .await
    }

    pub async fn list_application_settings_slot(&self, id: &FunctionAppSlotId) -> Result<StringDictionary, ApiError> {
        self.codec
            .execute_model(&LIST_APPLICATION_SETTINGS_SLOT, &id.id(), None, &[])
            .await
    }

    pub async fn list_connection_strings_slot(
        &self,
        id: &FunctionAppSlotId,
    ) -> Result<ConnectionStringDictionary, ApiError> {
        self.codec
            .execute_model(&LIST_CONNECTION_STRINGS_SLOT, &id.id(), None, &[])
            .await
    }

    pub async fn update_connection_strings_slot(
        &self,
        id: &FunctionAppSlotId,
        input: &ConnectionStringDictionary,
    ) -> Result<Option<ConnectionStringDictionary>, ApiError> {
        let body = Codec::encode(&UPDATE_CONNECTION_STRINGS_SLOT, input)?;
        self.codec
            .execute_json(&UPDATE_CONNECTION_STRINGS_SLOT, &id.id(), Some(body), &[])
            .await
            .map(|r| r.model)
    }

    /// Starts the listing; the result arrives once the poller finishes
    pub async fn list_publishing_credentials_slot(&self, id: &FunctionAppSlotId) -> Result<ArmResponse, ApiError> {
        self.codec
            .execute(&LIST_PUBLISHING_CREDENTIALS_SLOT, &id.id(), None, &[])
            .await
    }

    /// Decode the final response of [`Self::list_publishing_credentials_slot`]
    pub fn publishing_credentials(response: &ArmResponse) -> Result<Option<User>, ApiError> {
        codec::decode(&LIST_PUBLISHING_CREDENTIALS_SLOT, response)
    }

    pub async fn get_auth_settings_slot(&self, id: &FunctionAppSlotId) -> Result<SiteAuthSettings, ApiError> {
        self.codec
            .execute_model(&GET_AUTH_SETTINGS_SLOT, &id.id(), None, &[])
            .await
    }

    pub async fn update_auth_settings_slot(
        &self,
        id: &FunctionAppSlotId,
        input: &SiteAuthSettings,
    ) -> Result<Option<SiteAuthSettings>, ApiError> {
        let body = Codec::encode(&UPDATE_AUTH_SETTINGS_SLOT, input)?;
        self.codec
            .execute_json(&UPDATE_AUTH_SETTINGS_SLOT, &id.id(), Some(body), &[])
            .await
            .map(|r| r.model)
    }

    pub async fn get_backup_configuration_slot(&self, id: &FunctionAppSlotId) -> Result<BackupRequest, ApiError> {
        self.codec
            .execute_model(&GET_BACKUP_CONFIGURATION_SLOT, &id.id(), None, &[])
            .await
    }

    pub async fn update_backup_configuration_slot(
        &self,
        id: &FunctionAppSlotId,
        input: &BackupRequest,
    ) -> Result<Option<BackupRequest>, ApiError> {
        let body = Codec::encode(&UPDATE_BACKUP_CONFIGURATION_SLOT, input)?;
        self.codec
            .execute_json(&UPDATE_BACKUP_CONFIGURATION_SLOT, &id.id(), Some(body), &[])
            .await
            .map(|r| r.model)
    }

    pub async fn delete_backup_configuration_slot(&self, id: &FunctionAppSlotId) -> Result<(), ApiError> {
        self.codec
            .execute(&DELETE_BACKUP_CONFIGURATION_SLOT, &id.id(), None, &[])
            .await
            .map(|_| ())
    }

    pub async fn get_diagnostic_logs_configuration_slot(
        &self,
        id: &FunctionAppSlotId,
    ) -> Result<SiteLogsConfig, ApiError> {
        self.codec
            .execute_model(&GET_DIAGNOSTIC_LOGS_CONFIGURATION_SLOT, &id.id(), None, &[])
            .await
    }

    pub async fn update_diagnostic_logs_config_slot(
        &self,
        id: &FunctionAppSlotId,
        input: &SiteLogsConfig,
    ) -> Result<Option<SiteLogsConfig>, ApiError> {
        let body = Codec::encode(&UPDATE_DIAGNOSTIC_LOGS_CONFIG_SLOT, input)?;
        self.codec
            .execute_json(&UPDATE_DIAGNOSTIC_LOGS_CONFIG_SLOT, &id.id(), Some(body), &[])
            .await
            .map(|r| r.model)
    }

    pub async fn get_configuration_slot(&self, id: &FunctionAppSlotId) -> Result<SiteConfigResource, ApiError> {
        self.codec
            .execute_model(&GET_CONFIGURATION_SLOT, &id.id(), None, &[])
            .await
    }

    pub async fn update_configuration_slot(
        &self,
        id: &FunctionAppSlotId,
        input: &SiteConfigResource,
    ) -> Result<Option<SiteConfigResource>, ApiError> {
        let body = Codec::encode(&UPDATE_CONFIGURATION_SLOT, input)?;
        self.codec
            .execute_json(&UPDATE_CONFIGURATION_SLOT, &id.id(), Some(body), &[])
            .await
            .map(|r| r.model)
    }
}
