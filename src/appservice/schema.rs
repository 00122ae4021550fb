//! Field table for the Linux Function App Slot
//!
//! The table lives in the embedded resource registry. It is bound to
//! [`LinuxFunctionAppSlotModel`] at startup: every table entry must be a
//! field of the model and every model field must have an entry.

use super::diff::Field;
use super::model::LinuxFunctionAppSlotModel;
use super::validate;
use crate::error::ValidationErrors;
use crate::resource::registry::{self, FieldDef, FieldKind, ResourceDef, SchemaError};
use serde_json::{Map, Value};

pub const RESOURCE_TYPE: &str = "azurerm_linux_function_app_slot";

/// Load the field table and check it against the model
pub fn load() -> Result<&'static ResourceDef, SchemaError> {
    let def = registry::get_resource(RESOURCE_TYPE)?;
    check_binding(def)?;
    Ok(def)
}

fn mismatch(field: &str, message: impl Into<String>) -> SchemaError {
    SchemaError::Inconsistent {
        resource: RESOURCE_TYPE.to_string(),
        field: field.to_string(),
        message: message.into(),
    }
}

fn model_view(model: &LinuxFunctionAppSlotModel) -> Map<String, Value> {
    match serde_json::to_value(model) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn kind_matches(kind: FieldKind, value: &Value) -> bool {
    match (kind, value) {
        (FieldKind::String, Value::String(_)) => true,
        (FieldKind::Bool, Value::Bool(_)) => true,
        (FieldKind::Int, Value::Number(n)) => n.is_i64(),
        (FieldKind::Map, Value::Object(_)) => true,
        (FieldKind::List, Value::Array(_)) => true,
        (FieldKind::Block, Value::Object(_) | Value::Null) => true,
        _ => false,
    }
}

/// Check that the table and the model describe the same fields
pub fn check_binding(def: &ResourceDef) -> Result<(), SchemaError> {
    let defaults = model_view(&LinuxFunctionAppSlotModel::default());

    for field in &def.fields {
        let value = defaults
            .get(&field.name)
            .ok_or_else(|| mismatch(&field.name, "is not a field of the model"))?;
        if !kind_matches(field.kind, value) {
            return Err(mismatch(&field.name, format!("is not of kind {:?}", field.kind)));
        }
        if let Some(default) = &field.default {
            if default != value {
                return Err(mismatch(
                    &field.name,
                    format!("declares default {} but the model defaults to {}", default, value),
                ));
            }
        }
        if let Some(name) = &field.validation {
            if validate::lookup(name).is_none() {
                return Err(mismatch(&field.name, format!("names unknown validator {:?}", name)));
            }
        }
    }

    for name in defaults.keys() {
        if def.field(name).is_none() {
            return Err(mismatch(name, "has no entry in the field table"));
        }
    }

    for field in Field::ALL {
        let top = field.path().split('.').next().unwrap_or_default();
        match def.field(top) {
            Some(f) if f.is_user_settable() => {}
            _ => return Err(mismatch(top, "is tracked for changes but not user-settable")),
        }
    }

    Ok(())
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn check_field(field: &FieldDef, record: &Map<String, Value>, errors: &mut ValidationErrors) {
    let value = record.get(&field.name).unwrap_or(&Value::Null);
    let set = is_set(value);

    if field.required && !set && field.kind != FieldKind::Block {
        errors.push(&field.name, "is required");
    }
    if field.required && field.kind == FieldKind::Block && value.is_null() {
        errors.push(&field.name, "is required");
    }

    if set {
        if let Some(check) = field.validation.as_deref().and_then(validate::lookup) {
            if let Err(message) = check(value) {
                errors.push(&field.name, message);
            }
        }
        for other in &field.conflicts_with {
            if record.get(other).map(is_set).unwrap_or(false) {
                errors.push(
                    &field.name,
                    format!("conflicts with {:?}", other),
                );
            }
        }
    }
}

/// Validate a desired-state record against the field table and the nested
/// block constraints. No remote calls are made.
pub fn validate_model(
    def: &ResourceDef,
    model: &LinuxFunctionAppSlotModel,
) -> Result<(), ValidationErrors> {
    let record = model_view(model);
    let mut errors = ValidationErrors::new();

    for field in def.fields.iter().filter(|f| f.is_user_settable()) {
        check_field(field, &record, &mut errors);
    }

    // Each exactly_one_of group is reported once, under its first member
    let mut seen: Vec<&Vec<String>> = Vec::new();
    for field in &def.fields {
        let group = &field.exactly_one_of;
        if group.is_empty() || seen.iter().any(|g| *g == group) {
            continue;
        }
        seen.push(group);
        let count = group
            .iter()
            .filter(|name| record.get(name.as_str()).map(is_set).unwrap_or(false))
            .count();
        if count != 1 {
            errors.push(
                &group[0],
                format!("exactly one of {:?} must be specified", group),
            );
        }
    }

    errors.extend(validate::validate_nested(model));
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_model() -> LinuxFunctionAppSlotModel {
        LinuxFunctionAppSlotModel {
            name: "staging".to_string(),
            function_app_id: "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Web/sites/app1".to_string(),
            storage_account_name: "acct1".to_string(),
            storage_account_access_key: "a2V5".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_table_binds_to_model() {
        let def = load().unwrap();
        assert!(def.field("site_config").unwrap().required);
    }

    #[test]
    fn test_valid_model_passes() {
        let def = load().unwrap();
        assert!(validate_model(def, &valid_model()).is_ok());
    }

    #[test]
    fn test_missing_storage_is_reported() {
        let def = load().unwrap();
        let model = LinuxFunctionAppSlotModel {
            storage_account_name: String::new(),
            storage_account_access_key: String::new(),
            ..valid_model()
        };
        let errors = validate_model(def, &model).unwrap_err();
        assert!(errors.mentions("storage_account_name"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_both_storage_sources_are_reported() {
        let def = load().unwrap();
        let model = LinuxFunctionAppSlotModel {
            storage_account_access_key: String::new(),
            storage_key_vault_secret_id: "https://kv1.vault.azure.net/secrets/storage".to_string(),
            ..valid_model()
        };
        let errors = validate_model(def, &model).unwrap_err();
        assert!(errors.mentions("storage_account_name"));
    }

    #[test]
    fn test_access_key_conflicts_with_managed_identity() {
        let def = load().unwrap();
        let model = LinuxFunctionAppSlotModel {
            storage_uses_managed_identity: true,
            ..valid_model()
        };
        let errors = validate_model(def, &model).unwrap_err();
        assert!(errors.mentions("storage_account_access_key"));
        assert!(errors.mentions("storage_uses_managed_identity"));
    }

    #[test]
    fn test_field_validators_run() {
        let def = load().unwrap();
        let model = LinuxFunctionAppSlotModel {
            name: "bad_name".to_string(),
            daily_memory_time_quota: -1,
            ..valid_model()
        };
        let errors = validate_model(def, &model).unwrap_err();
        assert!(errors.mentions("name"));
        assert!(errors.mentions("daily_memory_time_quota"));
    }

    #[test]
    fn test_required_fields() {
        let def = load().unwrap();
        let model = LinuxFunctionAppSlotModel {
            name: String::new(),
            function_app_id: String::new(),
            ..valid_model()
        };
        let errors = validate_model(def, &model).unwrap_err();
        assert!(errors.mentions("name"));
        assert!(errors.mentions("function_app_id"));
    }
}
