//! Provider error taxonomy
//!
//! Every lifecycle failure is reported as a [`ProviderError`] naming the
//! resource type, the identifier and the sub-step that failed. A primary
//! resource that no longer exists is not an error; Read reports it through
//! [`ReadOutcome::Gone`].

use crate::arm::{ApiError, PollError};
use crate::ids::IdParseError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All problems found in one desired-state record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Whether any error concerns `field`
    pub fn mentions(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::error::Error for ValidationErrors {}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.len() {
            0 => write!(f, "no validation errors"),
            1 => write!(f, "{}", self.0[0]),
            n => {
                write!(f, "{} validation errors: ", n)?;
                for (i, e) in self.0.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{resource}: invalid configuration: {source}")]
    Validation {
        resource: &'static str,
        #[source]
        source: ValidationErrors,
    },

    #[error("{resource}: {source}")]
    InvalidId {
        resource: &'static str,
        #[source]
        source: IdParseError,
    },

    #[error(
        "A resource with the ID {id:?} already exists - to be managed this resource needs to be imported. \
         See the documentation for {resource:?} for more information."
    )]
    RequiresImport { resource: &'static str, id: String },

    #[error("{resource}: {step} {id}: {source}")]
    Api {
        resource: &'static str,
        step: String,
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("{resource}: waiting for {step} of {id}: {source}")]
    Wait {
        resource: &'static str,
        step: String,
        id: String,
        #[source]
        source: PollError,
    },

    #[error("{resource}: {step} {id}: {message}")]
    Invalid {
        resource: &'static str,
        step: String,
        id: String,
        message: String,
    },

    #[error("{resource}: {operation} of {id} did not complete within {budget:?}")]
    Timeout {
        resource: &'static str,
        operation: &'static str,
        id: String,
        budget: Duration,
    },
}

impl ProviderError {
    /// The sub-step that failed, for errors raised by a remote call
    pub fn step(&self) -> Option<&str> {
        match self {
            ProviderError::Api { step, .. }
            | ProviderError::Wait { step, .. }
            | ProviderError::Invalid { step, .. } => Some(step),
            _ => None,
        }
    }

    pub fn is_requires_import(&self) -> bool {
        matches!(self, ProviderError::RequiresImport { .. })
    }
}

/// Result of a Read: the refreshed record, or a signal that the remote
/// resource is gone and should be dropped from tracked state
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    Present(T),
    Gone,
}

impl<T> ReadOutcome<T> {
    pub fn is_gone(&self) -> bool {
        matches!(self, ReadOutcome::Gone)
    }

    pub fn present(self) -> Option<T> {
        match self {
            ReadOutcome::Present(value) => Some(value),
            ReadOutcome::Gone => None,
        }
    }
}

/// Attaches resource type and identifier to errors raised inside one
/// lifecycle operation
#[derive(Debug, Clone)]
pub struct Scope {
    resource: &'static str,
    id: String,
}

impl Scope {
    pub fn new(resource: &'static str, id: &impl fmt::Display) -> Self {
        Self {
            resource,
            id: id.to_string(),
        }
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wrap an [`ApiError`] raised by `step`
    pub fn api<'a>(&'a self, step: &'a str) -> impl FnOnce(ApiError) -> ProviderError + 'a {
        move |source| ProviderError::Api {
            resource: self.resource,
            step: step.to_string(),
            id: self.id.clone(),
            source,
        }
    }

    /// Wrap a [`PollError`] raised while waiting for `step`
    pub fn wait<'a>(&'a self, step: &'a str) -> impl FnOnce(PollError) -> ProviderError + 'a {
        move |source| ProviderError::Wait {
            resource: self.resource,
            step: step.to_string(),
            id: self.id.clone(),
            source,
        }
    }

    pub fn invalid(&self, step: &str, message: impl Into<String>) -> ProviderError {
        ProviderError::Invalid {
            resource: self.resource,
            step: step.to_string(),
            id: self.id.clone(),
            message: message.into(),
        }
    }

    pub fn requires_import(&self, id: impl Into<String>) -> ProviderError {
        ProviderError::RequiresImport {
            resource: self.resource,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_display() {
        let mut errors = ValidationErrors::new();
        assert!(errors.clone().into_result().is_ok());

        errors.push("name", "must not be empty");
        assert_eq!(errors.to_string(), "name: must not be empty");

        errors.push("storage_account_name", "only one of these may be set");
        assert_eq!(
            errors.to_string(),
            "2 validation errors: name: must not be empty; storage_account_name: only one of these may be set"
        );
        assert!(errors.mentions("name"));
        assert!(!errors.mentions("tags"));
    }

    #[test]
    fn test_scope_invalid_names_step_and_id() {
        let scope = Scope::new("azurerm_linux_function_app_slot", &"Function App Slot \"x\"");
        let err = scope.invalid("determining plan type for", "the plan has no SKU tier");
        assert_eq!(err.step(), Some("determining plan type for"));
        assert_eq!(
            err.to_string(),
            "azurerm_linux_function_app_slot: determining plan type for Function App Slot \"x\": the plan has no SKU tier"
        );
    }

    #[test]
    fn test_read_outcome() {
        assert!(ReadOutcome::<()>::Gone.is_gone());
        assert_eq!(ReadOutcome::Present(3).present(), Some(3));
    }
}
