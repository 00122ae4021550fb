//! Azure Authentication
//!
//! Bearer tokens for the Resource Manager endpoint. Acquiring credentials is
//! left to the operator: a static token, the `ARM_ACCESS_TOKEN` environment
//! variable, or the Azure CLI's cached login.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Resource the tokens are requested for
pub const ARM_RESOURCE: &str = "https://management.azure.com/";

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("running the Azure CLI: {0}")]
    Cli(#[source] std::io::Error),

    #[error("the Azure CLI exited with {status}: {stderr}")]
    CliFailed { status: String, stderr: String },

    #[error("parsing Azure CLI token output: {0}")]
    CliOutput(#[source] serde_json::Error),
}

/// Source of bearer tokens for ARM calls
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self) -> Result<String, CredentialError>;
}

/// A fixed token, mostly useful in tests and short-lived automation
#[derive(Clone)]
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

impl std::fmt::Debug for StaticTokenCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenCredential").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self) -> Result<String, CredentialError> {
        Ok(self.token.clone())
    }
}

/// Reads `ARM_ACCESS_TOKEN` on every call
#[derive(Debug, Clone, Default)]
pub struct EnvironmentCredential;

impl EnvironmentCredential {
    pub const VARIABLE: &'static str = "ARM_ACCESS_TOKEN";
}

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    async fn get_token(&self) -> Result<String, CredentialError> {
        std::env::var(Self::VARIABLE).map_err(|_| CredentialError::MissingEnv(Self::VARIABLE))
    }
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Unix timestamp, present in newer CLI versions
    #[serde(default, rename = "expires_on")]
    expires_on: Option<i64>,
}

/// Tokens from `az account get-access-token`, cached until shortly before expiry
#[derive(Clone)]
pub struct AzureCliCredential {
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl std::fmt::Debug for AzureCliCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureCliCredential").finish_non_exhaustive()
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self {
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Force the next call to go back to the CLI
    pub async fn clear(&self) {
        let mut cache = self.token_cache.write().await;
        *cache = None;
    }

    async fn fetch(&self) -> Result<CachedToken, CredentialError> {
        let output = tokio::process::Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                ARM_RESOURCE,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(CredentialError::Cli)?;

        if !output.status.success() {
            return Err(CredentialError::CliFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let parsed: CliToken = serde_json::from_slice(&output.stdout).map_err(CredentialError::CliOutput)?;
        let ttl = parsed
            .expires_on
            .and_then(remaining_lifetime)
            .unwrap_or(DEFAULT_TOKEN_TTL);

        Ok(CachedToken {
            token: parsed.access_token,
            expires_at: Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER),
        })
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn get_token(&self) -> Result<String, CredentialError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let fresh = self.fetch().await?;
        let token = fresh.token.clone();
        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(fresh);
        }

        Ok(token)
    }
}

/// Time left until the given unix timestamp, if it is in the future
fn remaining_lifetime(expires_on: i64) -> Option<Duration> {
    let expires = chrono::DateTime::from_timestamp(expires_on, 0)?;
    (expires - chrono::Utc::now()).to_std().ok()
}

/// Get the Azure CLI configuration directory
pub fn get_azure_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AZURE_CONFIG_DIR") {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|p| p.join(".azure"))
}

/// Subscription IDs are GUIDs
fn validate_subscription_id(subscription: &str) -> bool {
    let groups: Vec<&str> = subscription.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];
    groups.len() == lengths.len()
        && groups
            .iter()
            .zip(lengths)
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureProfile {
    #[serde(default)]
    subscriptions: Vec<ProfileSubscription>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileSubscription {
    id: String,
    #[serde(default)]
    is_default: bool,
}

/// Read the default subscription from the environment or the Azure CLI profile
/// Security: Validates subscription ID format before returning
pub fn get_default_subscription() -> Option<String> {
    for var in ["ARM_SUBSCRIPTION_ID", "AZURE_SUBSCRIPTION_ID"] {
        if let Ok(subscription) = std::env::var(var) {
            if validate_subscription_id(&subscription) {
                return Some(subscription);
            }
            tracing::warn!("Invalid subscription ID format in {}", var);
        }
    }

    let profile_path = get_azure_config_dir()?.join("azureProfile.json");
    let content = std::fs::read_to_string(profile_path).ok()?;
    default_subscription_from_profile(&content)
}

fn default_subscription_from_profile(content: &str) -> Option<String> {
    // The CLI writes this file with a UTF-8 BOM
    let content = content.trim_start_matches('\u{feff}');
    let profile: AzureProfile = serde_json::from_str(content).ok()?;
    profile
        .subscriptions
        .into_iter()
        .find(|s| s.is_default)
        .map(|s| s.id)
        .filter(|id| validate_subscription_id(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_subscription_id() {
        assert!(validate_subscription_id("00000000-0000-0000-0000-000000000000"));
        assert!(validate_subscription_id("1a2b3c4d-AAAA-bbbb-1234-0123456789ab"));
        assert!(!validate_subscription_id("not-a-guid"));
        assert!(!validate_subscription_id("00000000-0000-0000-0000-00000000000g"));
    }

    #[test]
    fn test_profile_default_subscription() {
        let content = "\u{feff}{\"subscriptions\":[{\"id\":\"11111111-1111-1111-1111-111111111111\",\"isDefault\":false},{\"id\":\"22222222-2222-2222-2222-222222222222\",\"isDefault\":true}]}";
        assert_eq!(
            default_subscription_from_profile(content),
            Some("22222222-2222-2222-2222-222222222222".to_string())
        );
    }

    #[test]
    fn test_profile_without_default() {
        let content = "{\"subscriptions\":[]}";
        assert_eq!(default_subscription_from_profile(content), None);
    }

    #[test]
    fn test_static_token() {
        let credential = StaticTokenCredential::new("abc");
        let token = tokio_test::block_on(credential.get_token()).unwrap();
        assert_eq!(token, "abc");
    }

    #[test]
    fn test_remaining_lifetime_in_past_is_none() {
        assert!(remaining_lifetime(0).is_none());
    }
}
