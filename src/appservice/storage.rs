//! Backing storage wiring and plan-dependent content share settings

use super::app_settings::{WEB_JOBS_STORAGE, WEB_JOBS_STORAGE_ACCOUNT_NAME};
use super::model::LinuxFunctionAppSlotModel;

/// Storage endpoint suffix of the public cloud
pub const DEFAULT_STORAGE_ENDPOINT_SUFFIX: &str = "core.windows.net";

const KEY_VAULT_PREFIX: &str = "@Microsoft.KeyVault(SecretUri=";

/// Plan tiers on which content share settings are never sent
const TIERS_WITHOUT_CONTENT_SHARE: &[&str] = &["dynamic", "basic", "standard", "premiumv2", "premiumv3"];

/// Elastic Premium SKU names
const ELASTIC_SKUS: &[&str] = &["EP1", "EP2", "EP3"];

/// How the Functions host reaches its storage account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConnection {
    AccessKey {
        account_name: String,
        access_key: String,
        endpoint_suffix: String,
    },
    KeyVault {
        secret_id: String,
    },
    ManagedIdentity {
        account_name: String,
    },
}

impl StorageConnection {
    pub fn from_model(model: &LinuxFunctionAppSlotModel, endpoint_suffix: &str) -> Self {
        if model.storage_uses_managed_identity {
            StorageConnection::ManagedIdentity {
                account_name: model.storage_account_name.clone(),
            }
        } else if !model.storage_key_vault_secret_id.is_empty() {
            StorageConnection::KeyVault {
                secret_id: model.storage_key_vault_secret_id.clone(),
            }
        } else {
            StorageConnection::AccessKey {
                account_name: model.storage_account_name.clone(),
                access_key: model.storage_account_access_key.clone(),
                endpoint_suffix: endpoint_suffix.to_string(),
            }
        }
    }

    /// The value stored in app settings: a connection string, a Key Vault
    /// reference, or the bare account name for managed identity
    pub fn value(&self) -> String {
        match self {
            StorageConnection::AccessKey {
                account_name,
                access_key,
                endpoint_suffix,
            } => format!(
                "DefaultEndpointsProtocol=https;AccountName={};AccountKey={};EndpointSuffix={}",
                account_name, access_key, endpoint_suffix
            ),
            StorageConnection::KeyVault { secret_id } => format!("{}{})", KEY_VAULT_PREFIX, secret_id),
            StorageConnection::ManagedIdentity { account_name } => account_name.clone(),
        }
    }

    pub fn uses_managed_identity(&self) -> bool {
        matches!(self, StorageConnection::ManagedIdentity { .. })
    }

    /// App setting that carries [`StorageConnection::value`]
    pub fn app_setting_key(&self) -> &'static str {
        if self.uses_managed_identity() {
            WEB_JOBS_STORAGE_ACCOUNT_NAME
        } else {
            WEB_JOBS_STORAGE
        }
    }
}

/// Secret URI inside a `@Microsoft.KeyVault(SecretUri=...)` reference
pub fn parse_key_vault_reference(value: &str) -> Option<&str> {
    value.strip_prefix(KEY_VAULT_PREFIX)?.strip_suffix(')')
}

/// Account name and key from a storage connection string; missing parts
/// come back empty
pub fn parse_web_jobs_storage_string(value: &str) -> (String, String) {
    let mut account_name = String::new();
    let mut account_key = String::new();
    for part in value.split(';') {
        if let Some(name) = part.strip_prefix("AccountName=") {
            account_name = name.to_string();
        } else if let Some(key) = part.strip_prefix("AccountKey=") {
            account_key = key.to_string();
        }
    }
    (account_name, account_key)
}

/// Whether Create should synthesize content share settings for a plan tier
pub fn tier_supports_content_share(tier: &str) -> bool {
    let tier = tier.to_ascii_lowercase();
    !TIERS_WITHOUT_CONTENT_SHARE.contains(&tier.as_str())
}

pub fn plan_is_elastic(sku_name: &str) -> bool {
    ELASTIC_SKUS.iter().any(|sku| sku.eq_ignore_ascii_case(sku_name))
}

/// Share name for `WEBSITE_CONTENTSHARE`: the lowercased slot name and a
/// short random suffix
pub fn content_share_name(slot_name: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", slot_name.to_lowercase(), &suffix[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LinuxFunctionAppSlotModel {
        LinuxFunctionAppSlotModel {
            storage_account_name: "acct1".to_string(),
            storage_account_access_key: "c2VjcmV0".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_access_key_connection_string() {
        let conn = StorageConnection::from_model(&model(), DEFAULT_STORAGE_ENDPOINT_SUFFIX);
        assert_eq!(
            conn.value(),
            "DefaultEndpointsProtocol=https;AccountName=acct1;AccountKey=c2VjcmV0;EndpointSuffix=core.windows.net"
        );
        assert_eq!(conn.app_setting_key(), "AzureWebJobsStorage");
        assert_eq!(
            parse_web_jobs_storage_string(&conn.value()),
            ("acct1".to_string(), "c2VjcmV0".to_string())
        );
    }

    #[test]
    fn test_key_vault_reference() {
        let mut m = model();
        m.storage_account_name.clear();
        m.storage_account_access_key.clear();
        m.storage_key_vault_secret_id = "https://kv.vault.azure.net/secrets/storage/abc".to_string();

        let conn = StorageConnection::from_model(&m, DEFAULT_STORAGE_ENDPOINT_SUFFIX);
        let value = conn.value();
        assert_eq!(
            value,
            "@Microsoft.KeyVault(SecretUri=https://kv.vault.azure.net/secrets/storage/abc)"
        );
        assert_eq!(
            parse_key_vault_reference(&value),
            Some("https://kv.vault.azure.net/secrets/storage/abc")
        );
    }

    #[test]
    fn test_managed_identity_uses_account_name() {
        let mut m = model();
        m.storage_account_access_key.clear();
        m.storage_uses_managed_identity = true;

        let conn = StorageConnection::from_model(&m, DEFAULT_STORAGE_ENDPOINT_SUFFIX);
        assert_eq!(conn.value(), "acct1");
        assert_eq!(conn.app_setting_key(), "AzureWebJobsStorage__accountName");
    }

    #[test]
    fn test_tiers() {
        assert!(!tier_supports_content_share("Dynamic"));
        assert!(!tier_supports_content_share("PremiumV3"));
        assert!(tier_supports_content_share("ElasticPremium"));
        assert!(plan_is_elastic("ep2"));
        assert!(!plan_is_elastic("P1v3"));
    }

    #[test]
    fn test_content_share_name() {
        let name = content_share_name("Staging");
        assert!(name.starts_with("staging-"));
        assert_eq!(name.len(), "staging-".len() + 4);
    }
}
