//! Long-running operation polling
//!
//! ARM answers slow writes with `201`/`202` and one of two polling headers:
//! `Azure-AsyncOperation` (a status monitor returning `{"status": ...}`) or
//! `Location` (returns `202` until the result is ready). Without either
//! header the body's `properties.provisioningState` decides: a non-terminal
//! state is polled by re-reading the original request URL.

use super::codec::CloudError;
use super::http::{ArmRequest, ArmResponse, Transport, TransportError};
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Interval used when the service does not send `Retry-After`
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PollError {
    #[error("polling {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("polling {url}: unexpected status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("polling {url}: decoding operation status: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("the long-running operation ended with status {status:?}{detail}")]
    Failed { status: String, detail: String },

    #[error("provisioning state is {state:?} but the response has no URL to poll")]
    NoPollUrl { state: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisioningProperties {
    #[serde(default)]
    provisioning_state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProvisionedResource {
    #[serde(default)]
    properties: Option<ProvisioningProperties>,
}

/// `properties.provisioningState` of a resource body, when there is one
fn provisioning_state(body: &str) -> Option<String> {
    serde_json::from_str::<ProvisionedResource>(body)
        .ok()?
        .properties?
        .provisioning_state
        .filter(|s| !s.is_empty())
}

enum Terminal {
    Succeeded,
    Failed,
}

fn terminal_state(state: &str) -> Option<Terminal> {
    match state.to_ascii_lowercase().as_str() {
        "succeeded" => Some(Terminal::Succeeded),
        "failed" | "canceled" | "cancelled" => Some(Terminal::Failed),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    #[serde(default)]
    status: String,
    #[serde(flatten)]
    error: CloudError,
}

/// Waits for long-running operations to reach a terminal state
#[derive(Clone)]
pub struct Poller {
    transport: Arc<dyn Transport>,
    interval: Duration,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Poller {
    pub fn new(transport: Arc<dyn Transport>, interval: Duration) -> Self {
        Self {
            transport,
            interval,
        }
    }

    /// Block until the operation that produced `initial` completes
    ///
    /// Returns the response carrying the final result: the last `Location`
    /// response or re-read resource when there is one, otherwise `initial`.
    pub async fn wait(&self, initial: &ArmResponse) -> Result<ArmResponse, PollError> {
        let location = initial.header("location").map(str::to_string);

        if let Some(monitor) = initial.header("azure-asyncoperation") {
            self.wait_for_status_monitor(monitor, initial.retry_after()).await?;
            return match location {
                Some(location) => self.get(&location).await,
                None => Ok(initial.clone()),
            };
        }

        if initial.status == 202 {
            if let Some(location) = location {
                return self.wait_for_location(&location, initial.retry_after()).await;
            }
        }

        match provisioning_state(&initial.body) {
            None => Ok(initial.clone()),
            Some(state) => match terminal_state(&state) {
                Some(Terminal::Succeeded) => Ok(initial.clone()),
                Some(Terminal::Failed) => Err(PollError::Failed {
                    status: state,
                    detail: String::new(),
                }),
                None if initial.url.is_empty() => Err(PollError::NoPollUrl { state }),
                None => self.wait_for_provisioning(&initial.url, initial.retry_after()).await,
            },
        }
    }

    /// Re-read the resource until its provisioning state is terminal
    async fn wait_for_provisioning(&self, url: &str, first_delay: Option<Duration>) -> Result<ArmResponse, PollError> {
        let mut delay = first_delay.unwrap_or(self.interval);
        loop {
            tokio::time::sleep(delay).await;

            let response = self.get(url).await?;
            if !(200..300).contains(&response.status) {
                return Err(PollError::UnexpectedStatus {
                    url: url.to_string(),
                    status: response.status,
                });
            }

            let state = provisioning_state(&response.body).unwrap_or_default();
            tracing::debug!("provisioning state: {}", state);
            match terminal_state(&state) {
                // A body without a state is a resource that has settled
                Some(Terminal::Succeeded) => return Ok(response),
                None if state.is_empty() => return Ok(response),
                Some(Terminal::Failed) => {
                    return Err(PollError::Failed {
                        status: state,
                        detail: String::new(),
                    })
                }
                None => delay = response.retry_after().unwrap_or(self.interval),
            }
        }
    }

    async fn wait_for_status_monitor(&self, url: &str, first_delay: Option<Duration>) -> Result<(), PollError> {
        let mut delay = first_delay.unwrap_or(self.interval);
        loop {
            tokio::time::sleep(delay).await;

            let response = self.get(url).await?;
            if !(200..300).contains(&response.status) {
                return Err(PollError::UnexpectedStatus {
                    url: url.to_string(),
                    status: response.status,
                });
            }
            let status: OperationStatus = serde_json::from_str(&response.body).map_err(|source| PollError::Decode {
                url: url.to_string(),
                source,
            })?;

            tracing::debug!("long-running operation status: {}", status.status);
            match status.status.to_ascii_lowercase().as_str() {
                "succeeded" => return Ok(()),
                "failed" | "canceled" | "cancelled" => {
                    let detail = status
                        .error
                        .error
                        .and_then(|e| e.message)
                        .map(|m| format!(": {}", m))
                        .unwrap_or_default();
                    return Err(PollError::Failed {
                        status: status.status,
                        detail,
                    });
                }
                _ => {}
            }

            delay = response.retry_after().unwrap_or(self.interval);
        }
    }

    async fn wait_for_location(&self, url: &str, first_delay: Option<Duration>) -> Result<ArmResponse, PollError> {
        let mut delay = first_delay.unwrap_or(self.interval);
        loop {
            tokio::time::sleep(delay).await;

            let response = self.get(url).await?;
            match response.status {
                202 => delay = response.retry_after().unwrap_or(self.interval),
                200 | 201 | 204 => return Ok(response),
                status => {
                    return Err(PollError::UnexpectedStatus {
                        url: url.to_string(),
                        status,
                    })
                }
            }
        }
    }

    async fn get(&self, url: &str) -> Result<ArmResponse, PollError> {
        self.transport
            .send(ArmRequest::new(Method::GET, url))
            .await
            .map_err(|source| PollError::Transport {
                url: url.to_string(),
                source,
            })
    }
}
