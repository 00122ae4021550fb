//! Resource Registry - Load resource definitions from JSON
//!
//! Resource metadata (field table, API version, default timeouts) is embedded
//! in the binary and checked for internal consistency on first access.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;
use thiserror::Error;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[include_str!("../resources/app_service.json")];

/// Shape of a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Bool,
    Int,
    Map,
    List,
    Block,
}

/// Field definition from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    /// Optional, but filled in from the API when unset
    #[serde(default)]
    pub computed: bool,
    /// Never set by the user
    #[serde(default)]
    pub computed_only: bool,
    #[serde(default)]
    pub force_new: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub validation: Option<String>,
    #[serde(default)]
    pub exactly_one_of: Vec<String>,
    #[serde(default)]
    pub conflicts_with: Vec<String>,
}

impl FieldDef {
    pub fn is_user_settable(&self) -> bool {
        !self.computed_only
    }
}

/// Default operation budgets, in minutes
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeoutsDef {
    pub create_minutes: u64,
    pub read_minutes: u64,
    pub update_minutes: u64,
    pub delete_minutes: u64,
}

/// Resource definition from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDef {
    pub display_name: String,
    pub provider: String,
    pub api_version: String,
    pub id_kind: String,
    pub timeouts: TimeoutsDef,
    pub fields: Vec<FieldDef>,
}

impl ResourceDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("failed to parse embedded resource JSON: {0}")]
    Parse(String),

    #[error("unknown resource type {0:?}")]
    UnknownResource(String),

    #[error("{resource}: field {field:?} is defined more than once")]
    Duplicate { resource: String, field: String },

    #[error("{resource}: field {field:?} refers to unknown field {reference:?}")]
    UnknownReference {
        resource: String,
        field: String,
        reference: String,
    },

    #[error("{resource}: exactly_one_of group of {field:?} is not shared by {other:?}")]
    Asymmetric {
        resource: String,
        field: String,
        other: String,
    },

    #[error("{resource}: field {field:?} {message}")]
    Inconsistent {
        resource: String,
        field: String,
        message: String,
    },
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<Result<ResourceConfig, SchemaError>> = OnceLock::new();

fn load() -> Result<ResourceConfig, SchemaError> {
    let mut final_config = ResourceConfig {
        resources: HashMap::new(),
    };

    for content in RESOURCE_FILES {
        let partial: ResourceConfig =
            serde_json::from_str(content).map_err(|e| SchemaError::Parse(e.to_string()))?;
        final_config.resources.extend(partial.resources);
    }

    for (key, def) in &final_config.resources {
        check_resource(key, def)?;
    }

    Ok(final_config)
}

/// Get the resource registry (loads and checks the embedded JSON on first access)
pub fn get_registry() -> Result<&'static ResourceConfig, SchemaError> {
    REGISTRY.get_or_init(load).as_ref().map_err(Clone::clone)
}

/// Get a resource definition by key
pub fn get_resource(key: &str) -> Result<&'static ResourceDef, SchemaError> {
    get_registry()?
        .resources
        .get(key)
        .ok_or_else(|| SchemaError::UnknownResource(key.to_string()))
}

/// Get all resource keys, sorted
pub fn get_all_resource_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = match get_registry() {
        Ok(registry) => registry.resources.keys().map(|s| s.as_str()).collect(),
        Err(_) => Vec::new(),
    };
    keys.sort_unstable();
    keys
}

/// Internal consistency of one resource definition
pub fn check_resource(key: &str, def: &ResourceDef) -> Result<(), SchemaError> {
    let mut names = BTreeSet::new();
    for field in &def.fields {
        if !names.insert(field.name.as_str()) {
            return Err(SchemaError::Duplicate {
                resource: key.to_string(),
                field: field.name.clone(),
            });
        }
    }

    for field in &def.fields {
        let inconsistent = |message: &str| SchemaError::Inconsistent {
            resource: key.to_string(),
            field: field.name.clone(),
            message: message.to_string(),
        };

        if field.required && (field.computed_only || field.default.is_some()) {
            return Err(inconsistent("is required but also computed or defaulted"));
        }
        if field.computed_only && (field.validation.is_some() || !field.conflicts_with.is_empty()) {
            return Err(inconsistent("is computed-only but carries user constraints"));
        }

        for reference in field.exactly_one_of.iter().chain(&field.conflicts_with) {
            if !names.contains(reference.as_str()) {
                return Err(SchemaError::UnknownReference {
                    resource: key.to_string(),
                    field: field.name.clone(),
                    reference: reference.clone(),
                });
            }
        }
        if field.conflicts_with.contains(&field.name) {
            return Err(inconsistent("conflicts with itself"));
        }

        if !field.exactly_one_of.is_empty() {
            if !field.exactly_one_of.contains(&field.name) {
                return Err(inconsistent("is missing from its own exactly_one_of group"));
            }
            let group: BTreeSet<&String> = field.exactly_one_of.iter().collect();
            for other in &field.exactly_one_of {
                let shared = def
                    .field(other)
                    .map(|o| o.exactly_one_of.iter().collect::<BTreeSet<_>>() == group)
                    .unwrap_or(false);
                if !shared {
                    return Err(SchemaError::Asymmetric {
                        resource: key.to_string(),
                        field: field.name.clone(),
                        other: other.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}
