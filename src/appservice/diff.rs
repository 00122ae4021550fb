//! Change detection between recorded and desired state
//!
//! Update never asks "did this field change?" of some ambient context; the
//! caller computes a [`ChangeSet`] once and passes it in.

use super::model::{LinuxFunctionAppSlotModel, SiteConfig};
use std::collections::BTreeSet;
use std::fmt;

/// User-settable fields that gate work during Update
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    AppSettings,
    AuthSettings,
    Backup,
    BuiltinLoggingEnabled,
    ClientCertificateEnabled,
    ClientCertificateMode,
    ConnectionStrings,
    ContentShareForceDisabled,
    DailyMemoryTimeQuota,
    Enabled,
    FunctionsExtensionVersion,
    HttpsOnly,
    Identity,
    KeyVaultReferenceIdentityId,
    SiteConfig,
    ApplicationStack,
    AppServiceLogs,
    Storage,
    Tags,
}

impl Field {
    pub const ALL: &'static [Field] = &[
        Field::AppSettings,
        Field::AuthSettings,
        Field::Backup,
        Field::BuiltinLoggingEnabled,
        Field::ClientCertificateEnabled,
        Field::ClientCertificateMode,
        Field::ConnectionStrings,
        Field::ContentShareForceDisabled,
        Field::DailyMemoryTimeQuota,
        Field::Enabled,
        Field::FunctionsExtensionVersion,
        Field::HttpsOnly,
        Field::Identity,
        Field::KeyVaultReferenceIdentityId,
        Field::SiteConfig,
        Field::ApplicationStack,
        Field::AppServiceLogs,
        Field::Storage,
        Field::Tags,
    ];

    /// Schema path of the field
    pub fn path(&self) -> &'static str {
        match self {
            Field::AppSettings => "app_settings",
            Field::AuthSettings => "auth_settings",
            Field::Backup => "backup",
            Field::BuiltinLoggingEnabled => "builtin_logging_enabled",
            Field::ClientCertificateEnabled => "client_certificate_enabled",
            Field::ClientCertificateMode => "client_certificate_mode",
            Field::ConnectionStrings => "connection_strings",
            Field::ContentShareForceDisabled => "content_share_force_disabled",
            Field::DailyMemoryTimeQuota => "daily_memory_time_quota",
            Field::Enabled => "enabled",
            Field::FunctionsExtensionVersion => "functions_extension_version",
            Field::HttpsOnly => "https_only",
            Field::Identity => "identity",
            Field::KeyVaultReferenceIdentityId => "key_vault_reference_identity_id",
            Field::SiteConfig => "site_config",
            Field::ApplicationStack => "site_config.application_stack",
            Field::AppServiceLogs => "site_config.app_service_logs",
            Field::Storage => "storage_account_name",
            Field::Tags => "tags",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// The set of fields that differ between two records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    fields: BTreeSet<Field>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// Compare user-settable fields; computed attributes are ignored
    pub fn between(prior: &LinuxFunctionAppSlotModel, desired: &LinuxFunctionAppSlotModel) -> Self {
        let mut changes = ChangeSet::new();
        let mut check = |field: Field, changed: bool| {
            if changed {
                changes.fields.insert(field);
            }
        };

        check(Field::AppSettings, prior.app_settings != desired.app_settings);
        check(Field::AuthSettings, prior.auth_settings != desired.auth_settings);
        check(Field::Backup, backup_differs(prior, desired));
        check(
            Field::BuiltinLoggingEnabled,
            prior.builtin_logging_enabled != desired.builtin_logging_enabled,
        );
        check(
            Field::ClientCertificateEnabled,
            prior.client_certificate_enabled != desired.client_certificate_enabled,
        );
        check(
            Field::ClientCertificateMode,
            prior.client_certificate_mode != desired.client_certificate_mode,
        );
        check(Field::ConnectionStrings, connection_strings_differ(prior, desired));
        check(
            Field::ContentShareForceDisabled,
            prior.content_share_force_disabled != desired.content_share_force_disabled,
        );
        check(
            Field::DailyMemoryTimeQuota,
            prior.daily_memory_time_quota != desired.daily_memory_time_quota,
        );
        check(Field::Enabled, prior.enabled != desired.enabled);
        check(
            Field::FunctionsExtensionVersion,
            prior.functions_extension_version != desired.functions_extension_version,
        );
        check(Field::HttpsOnly, prior.https_only != desired.https_only);
        check(Field::Identity, identity_differs(prior, desired));
        check(
            Field::KeyVaultReferenceIdentityId,
            prior.key_vault_reference_identity_id != desired.key_vault_reference_identity_id,
        );
        check(
            Field::SiteConfig,
            user_site_config(&prior.site_config) != user_site_config(&desired.site_config),
        );
        check(
            Field::ApplicationStack,
            prior.site_config.application_stack != desired.site_config.application_stack,
        );
        check(
            Field::AppServiceLogs,
            prior.site_config.app_service_logs != desired.site_config.app_service_logs,
        );
        check(
            Field::Storage,
            prior.storage_account_name != desired.storage_account_name
                || prior.storage_account_access_key != desired.storage_account_access_key
                || prior.storage_uses_managed_identity != desired.storage_uses_managed_identity
                || prior.storage_key_vault_secret_id != desired.storage_key_vault_secret_id,
        );
        check(Field::Tags, prior.tags != desired.tags);

        changes
    }

    pub fn insert(&mut self, field: Field) {
        self.fields.insert(field);
    }

    pub fn has(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().copied()
    }
}

impl FromIterator<Field> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self::from_fields(iter)
    }
}

fn user_site_config(config: &SiteConfig) -> SiteConfig {
    SiteConfig {
        linux_fx_version: String::new(),
        detailed_error_logging_enabled: false,
        ..config.clone()
    }
}

fn backup_differs(prior: &LinuxFunctionAppSlotModel, desired: &LinuxFunctionAppSlotModel) -> bool {
    let strip = |m: &LinuxFunctionAppSlotModel| {
        m.backup.clone().map(|mut b| {
            b.schedule.last_execution_time.clear();
            b
        })
    };
    strip(prior) != strip(desired)
}

fn connection_strings_differ(prior: &LinuxFunctionAppSlotModel, desired: &LinuxFunctionAppSlotModel) -> bool {
    let sorted = |m: &LinuxFunctionAppSlotModel| {
        let mut list = m.connection_strings.clone();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    };
    sorted(prior) != sorted(desired)
}

fn identity_differs(prior: &LinuxFunctionAppSlotModel, desired: &LinuxFunctionAppSlotModel) -> bool {
    let key = |m: &LinuxFunctionAppSlotModel| {
        m.identity.as_ref().map(|i| {
            let mut ids: Vec<String> = i.identity_ids.iter().map(|id| id.to_ascii_lowercase()).collect();
            ids.sort();
            (i.identity_type, ids)
        })
    };
    key(prior) != key(desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appservice::model::{ApplicationStack, ConnectionString};

    #[test]
    fn test_identical_records_have_no_changes() {
        let model = LinuxFunctionAppSlotModel::default();
        assert!(ChangeSet::between(&model, &model.clone()).is_empty());
    }

    #[test]
    fn test_tags_only() {
        let prior = LinuxFunctionAppSlotModel::default();
        let mut desired = prior.clone();
        desired.tags.insert("env".to_string(), "test".to_string());

        let changes = ChangeSet::between(&prior, &desired);
        assert_eq!(changes.iter().collect::<Vec<_>>(), vec![Field::Tags]);
    }

    #[test]
    fn test_stack_change_marks_site_config_too() {
        let prior = LinuxFunctionAppSlotModel::default();
        let mut desired = prior.clone();
        desired.site_config.application_stack = Some(ApplicationStack::Node {
            version: "18".to_string(),
        });

        let changes = ChangeSet::between(&prior, &desired);
        assert!(changes.has(Field::ApplicationStack));
        assert!(changes.has(Field::SiteConfig));
        assert!(!changes.has(Field::AppServiceLogs));
    }

    #[test]
    fn test_computed_fields_are_ignored() {
        let prior = LinuxFunctionAppSlotModel::default();
        let mut desired = prior.clone();
        desired.default_hostname = "x.azurewebsites.net".to_string();
        desired.site_config.linux_fx_version = "Node|18".to_string();
        assert!(ChangeSet::between(&prior, &desired).is_empty());
    }

    #[test]
    fn test_connection_string_order_is_not_a_change() {
        let a = ConnectionString {
            name: "a".to_string(),
            ..Default::default()
        };
        let b = ConnectionString {
            name: "b".to_string(),
            ..Default::default()
        };
        let prior = LinuxFunctionAppSlotModel {
            connection_strings: vec![a.clone(), b.clone()],
            ..Default::default()
        };
        let desired = LinuxFunctionAppSlotModel {
            connection_strings: vec![b, a],
            ..Default::default()
        };
        assert!(!ChangeSet::between(&prior, &desired).has(Field::ConnectionStrings));
    }
}
