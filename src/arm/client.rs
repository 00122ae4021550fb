//! ARM Client
//!
//! Main client for interacting with Azure Resource Manager, combining a
//! token source with the HTTP transport.

use super::auth::TokenCredential;
use super::http::{ArmHttpClient, ArmRequest, ArmResponse, Transport, TransportError};
use async_trait::async_trait;
use std::sync::Arc;

/// Public Azure cloud endpoint
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Main ARM client
#[derive(Clone)]
pub struct ArmClient {
    pub credential: Arc<dyn TokenCredential>,
    pub http: ArmHttpClient,
    pub subscription_id: String,
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.http.base_url().as_str())
            .field("subscription_id", &self.subscription_id)
            .finish_non_exhaustive()
    }
}

impl ArmClient {
    /// Create a new ARM client
    pub fn new(
        endpoint: &str,
        subscription_id: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, TransportError> {
        let http = ArmHttpClient::new(endpoint)?;

        Ok(Self {
            credential,
            http,
            subscription_id: subscription_id.to_string(),
        })
    }

    /// Replace the HTTP layer (retry settings, endpoint)
    pub fn with_http(mut self, http: ArmHttpClient) -> Self {
        self.http = http;
        self
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String, TransportError> {
        Ok(self.credential.get_token().await?)
    }

    /// Switch to a different subscription
    pub fn switch_subscription(&mut self, subscription_id: &str) {
        self.subscription_id = subscription_id.to_string();
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// `/subscriptions/{id}`
    pub fn subscription_path(&self) -> String {
        format!("/subscriptions/{}", self.subscription_id)
    }

    /// `/subscriptions/{id}/providers/{namespace}/{path}`
    pub fn provider_path(&self, namespace: &str, path: &str) -> String {
        format!("{}/providers/{}/{}", self.subscription_path(), namespace, path)
    }
}

#[async_trait]
impl Transport for ArmClient {
    async fn send(&self, request: ArmRequest) -> Result<ArmResponse, TransportError> {
        let token = self.get_token().await?;
        self.http.execute(&request, &token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::auth::StaticTokenCredential;

    #[test]
    fn test_provider_path() {
        let client = ArmClient::new(
            DEFAULT_ENDPOINT,
            "sub",
            Arc::new(StaticTokenCredential::new("t")),
        )
        .unwrap();
        assert_eq!(
            client.provider_path("Microsoft.Web", "checknameavailability"),
            "/subscriptions/sub/providers/Microsoft.Web/checknameavailability"
        );
    }

    #[test]
    fn test_switch_subscription() {
        let mut client = ArmClient::new(
            DEFAULT_ENDPOINT,
            "sub-a",
            Arc::new(StaticTokenCredential::new("t")),
        )
        .unwrap();
        client.switch_subscription("sub-b");
        assert_eq!(client.subscription_path(), "/subscriptions/sub-b");
    }
}
