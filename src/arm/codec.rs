//! Typed request/response codec
//!
//! Every API operation is described by an [`Operation`]: its name, HTTP
//! method, path suffix relative to the target resource ID and the set of
//! status codes that count as success. [`Codec::execute`] turns an operation
//! plus a resource path into a request, sends it through the injected
//! [`Transport`] and checks the status; [`Codec::execute_json`] additionally
//! decodes the body into a typed model.

use super::http::{ArmRequest, ArmResponse, Transport, TransportError};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Static description of one REST operation
#[derive(Debug)]
pub struct Operation {
    /// Client family, e.g. `web.WebAppsClient`
    pub client: &'static str,
    /// Operation name, e.g. `GetSlot`
    pub name: &'static str,
    pub method: Method,
    /// Appended to the resource ID, e.g. `/config/appsettings/list`
    pub suffix: &'static str,
    /// Status codes that mean success
    pub expected: &'static [u16],
}

/// Failure of a single API operation
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{client}#{operation}: Failure preparing request: {message}")]
    Prepare {
        client: &'static str,
        operation: &'static str,
        message: String,
    },

    #[error("{client}#{operation}: Failure sending request: {source}")]
    Send {
        client: &'static str,
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("{client}#{operation}: Failure responding to request: StatusCode={status}{detail}")]
    UnexpectedStatus {
        client: &'static str,
        operation: &'static str,
        status: u16,
        detail: String,
        response: ArmResponse,
    },

    #[error("{client}#{operation}: Failure responding to request: decoding body: {source}")]
    Decode {
        client: &'static str,
        operation: &'static str,
        #[source]
        source: serde_json::Error,
        response: ArmResponse,
    },

    #[error("{client}#{operation}: Failure responding to request: response body was empty")]
    EmptyBody {
        client: &'static str,
        operation: &'static str,
        response: ArmResponse,
    },
}

impl ApiError {
    /// HTTP status of the response, when one was received
    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The raw response, for callers that need to inspect it
    pub fn response(&self) -> Option<&ArmResponse> {
        match self {
            ApiError::UnexpectedStatus { response, .. }
            | ApiError::Decode { response, .. }
            | ApiError::EmptyBody { response, .. } => Some(response),
            _ => None,
        }
    }
}

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudError {
    #[serde(default)]
    pub error: Option<CloudErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn describe_error_body(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<CloudError>(body) else {
        return String::new();
    };
    let Some(error) = parsed.error else {
        return String::new();
    };
    let mut out = String::new();
    if let Some(code) = error.code {
        out.push_str(&format!(" Code={:?}", code));
    }
    if let Some(message) = error.message {
        out.push_str(&format!(" Message={:?}", message));
    }
    out
}

/// A decoded response: the raw response plus the model, if the body had one
#[derive(Debug, Clone)]
pub struct OperationResponse<T> {
    pub response: ArmResponse,
    pub model: Option<T>,
}

/// Executes [`Operation`]s for one API version
#[derive(Clone)]
pub struct Codec {
    transport: Arc<dyn Transport>,
    api_version: &'static str,
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl Codec {
    pub fn new(transport: Arc<dyn Transport>, api_version: &'static str) -> Self {
        Self {
            transport,
            api_version,
        }
    }

    pub fn api_version(&self) -> &'static str {
        self.api_version
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Serialize a request model, attributing failures to `op`
    pub fn encode<B: Serialize>(op: &Operation, body: &B) -> Result<Value, ApiError> {
        serde_json::to_value(body).map_err(|e| ApiError::Prepare {
            client: op.client,
            operation: op.name,
            message: e.to_string(),
        })
    }

    /// Send `op` against `resource_path` and check the status code
    pub async fn execute(
        &self,
        op: &Operation,
        resource_path: &str,
        body: Option<Value>,
        query: &[(&str, &str)],
    ) -> Result<ArmResponse, ApiError> {
        if !resource_path.starts_with('/') {
            return Err(ApiError::Prepare {
                client: op.client,
                operation: op.name,
                message: format!("resource path {:?} must start with '/'", resource_path),
            });
        }

        let mut request = ArmRequest::new(op.method.clone(), format!("{}{}", resource_path, op.suffix))
            .query("api-version", self.api_version);
        for (key, value) in query {
            request = request.query(key, value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|source| ApiError::Send {
                client: op.client,
                operation: op.name,
                source,
            })?;

        if !op.expected.contains(&response.status) {
            return Err(ApiError::UnexpectedStatus {
                client: op.client,
                operation: op.name,
                status: response.status,
                detail: describe_error_body(&response.body),
                response,
            });
        }

        Ok(response)
    }

    /// Like [`Codec::execute`], decoding the body into `T` when one is present
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        op: &Operation,
        resource_path: &str,
        body: Option<Value>,
        query: &[(&str, &str)],
    ) -> Result<OperationResponse<T>, ApiError> {
        let response = self.execute(op, resource_path, body, query).await?;
        let model = decode(op, &response)?;
        Ok(OperationResponse { response, model })
    }

    /// Like [`Codec::execute_json`] but a missing body is an error
    pub async fn execute_model<T: DeserializeOwned>(
        &self,
        op: &Operation,
        resource_path: &str,
        body: Option<Value>,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let result = self.execute_json(op, resource_path, body, query).await?;
        match result.model {
            Some(model) => Ok(model),
            None => Err(ApiError::EmptyBody {
                client: op.client,
                operation: op.name,
                response: result.response,
            }),
        }
    }
}

/// Decode a response body, treating an empty body as no model
pub fn decode<T: DeserializeOwned>(op: &Operation, response: &ArmResponse) -> Result<Option<T>, ApiError> {
    if response.body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&response.body)
        .map(Some)
        .map_err(|source| ApiError::Decode {
            client: op.client,
            operation: op.name,
            source,
            response: response.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GET_THING: Operation = Operation {
        client: "test.ThingsClient",
        name: "Get",
        method: Method::GET,
        suffix: "",
        expected: &[200],
    };

    #[test]
    fn test_describe_error_body() {
        let body = r#"{"error":{"code":"ResourceNotFound","message":"gone"}}"#;
        assert_eq!(
            describe_error_body(body),
            " Code=\"ResourceNotFound\" Message=\"gone\""
        );
        assert_eq!(describe_error_body("not json"), "");
    }

    #[test]
    fn test_decode_empty_body_is_none() {
        let response = ArmResponse {
            status: 200,
            ..Default::default()
        };
        let decoded: Option<Value> = decode(&GET_THING, &response).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_decode_failure_names_operation() {
        let response = ArmResponse {
            status: 200,
            body: "{not json".to_string(),
            ..Default::default()
        };
        let err = decode::<Value>(&GET_THING, &response).unwrap_err();
        assert!(err.to_string().starts_with("test.ThingsClient#Get"));
        assert_eq!(err.status(), Some(200));
    }
}
