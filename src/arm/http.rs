//! HTTP transport for Azure Resource Manager REST calls

use super::auth::CredentialError;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Default number of extra attempts for throttled or unavailable responses
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay between attempts when the server sends no `Retry-After`
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub fn sanitize_for_log(body: &str) -> String {
    let total = body.chars().count();
    let truncated = if total > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// A request ready to be sent
///
/// `url` is either a path relative to the ARM endpoint (`/subscriptions/...`)
/// or an absolute URL, as handed back in polling headers.
#[derive(Debug, Clone)]
pub struct ArmRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ArmRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A fully read response; the underlying connection has already been released
#[derive(Debug, Clone, Default)]
pub struct ArmResponse {
    /// Absolute URL of the request that produced this response, query included
    pub url: String,
    pub status: u16,
    /// Header names are lower-cased
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ArmResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// `Retry-After` in whole seconds, if the server sent one
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request URL {url:?}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("acquiring access token: {0}")]
    Credential(#[from] CredentialError),

    #[error("sending request: {0}")]
    Send(#[source] reqwest::Error),

    #[error("reading response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("building HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// The capability the codec sends requests through
///
/// Implementations own authentication and retry on transient failures.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ArmRequest) -> Result<ArmResponse, TransportError>;
}

/// HTTP client wrapper for ARM API calls
#[derive(Clone, Debug)]
pub struct ArmHttpClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    retry_delay: Duration,
}

impl ArmHttpClient {
    /// Create a new HTTP client rooted at `base_url` (e.g. `https://management.azure.com`)
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("azapps/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TransportError::Build)?;

        let base_url = Url::parse(base_url).map_err(|source| TransportError::Url {
            url: base_url.to_string(),
            source,
        })?;

        Ok(Self {
            client,
            base_url,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a relative path against the endpoint; absolute URLs pass through
    pub fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        self.base_url.join(url).map_err(|source| TransportError::Url {
            url: url.to_string(),
            source,
        })
    }

    /// Send a request, retrying throttled (429) and unavailable (503) responses
    pub async fn execute(&self, request: &ArmRequest, token: &str) -> Result<ArmResponse, TransportError> {
        let url = self.resolve(&request.url)?;
        let mut attempt = 0;

        loop {
            let response = self.send_once(request, url.clone(), token).await?;

            let transient = matches!(response.status, 429 | 503);
            if !transient || attempt >= self.max_retries {
                if !(200..300).contains(&response.status) {
                    tracing::error!(
                        "API error: {} {} -> {} - {}",
                        request.method,
                        url.path(),
                        response.status,
                        sanitize_for_log(&response.body)
                    );
                }
                return Ok(response);
            }

            let delay = response.retry_after().unwrap_or(self.retry_delay);
            attempt += 1;
            tracing::warn!(
                "{} {} returned {}, retrying in {:?} (attempt {}/{})",
                request.method,
                url.path(),
                response.status,
                delay,
                attempt,
                self.max_retries
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(&self, request: &ArmRequest, mut url: Url, token: &str) -> Result<ArmResponse, TransportError> {
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        tracing::debug!("{} {}", request.method, url);
        let request_url = url.to_string();

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json; charset=utf-8");

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(TransportError::Send)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(TransportError::Body)?;

        Ok(ArmResponse {
            url: request_url,
            status,
            headers,
            body,
        })
    }
}

/// Format an ARM error for display
/// Security: maps status codes to short hints instead of echoing API bodies
pub fn format_arm_error(error: &anyhow::Error) -> String {
    let status = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<super::codec::ApiError>())
        .and_then(|api| api.status());

    match status {
        Some(401) => return "Authentication failed. Run 'az login' or set ARM_ACCESS_TOKEN.".to_string(),
        Some(403) => return "Permission denied. Check your Azure RBAC role assignments.".to_string(),
        Some(404) => return "Resource not found.".to_string(),
        Some(409) => return "Resource conflict. The resource may already exist or be in use.".to_string(),
        Some(429) => return "Rate limit exceeded. Please try again later.".to_string(),
        Some(400) => return "Invalid request. Check your parameters.".to_string(),
        Some(500) | Some(502) | Some(503) => {
            return "Azure service temporarily unavailable. Please try again.".to_string()
        }
        _ => {}
    }

    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(160)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
