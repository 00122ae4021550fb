//! Field validators
//!
//! Top-level fields are validated through the schema table, which names a
//! validator from [`VALIDATORS`] per field. Nested blocks are checked by
//! [`validate_nested`].

use super::model::{ApplicationStack, IdentityType, LinuxFunctionAppSlotModel};
use crate::error::ValidationErrors;
use crate::ids::{FunctionAppId, ResourceId, UserAssignedIdentityId};
use serde_json::Value;

/// Signature shared by all named validators
pub type Validator = fn(&Value) -> Result<(), String>;

/// Validators the schema table may refer to by name
pub const VALIDATORS: &[(&str, Validator)] = &[
    ("web_app_name", |v| with_str(v, web_app_name)),
    ("function_app_id", |v| with_str(v, function_app_id)),
    ("storage_account_name", |v| with_str(v, storage_account_name)),
    ("key_vault_secret_id", |v| with_str(v, key_vault_secret_id)),
    ("user_assigned_identity_id", |v| with_str(v, user_assigned_identity_id)),
    ("no_zero_values", no_zero_values),
    ("int_at_least_0", |v| int_at_least(v, 0)),
];

pub fn lookup(name: &str) -> Option<Validator> {
    VALIDATORS.iter().find(|(n, _)| *n == name).map(|(_, f)| *f)
}

fn with_str(value: &Value, f: fn(&str) -> Result<(), String>) -> Result<(), String> {
    match value {
        Value::Null => Ok(()),
        Value::String(s) if s.is_empty() => Ok(()),
        Value::String(s) => f(s),
        other => Err(format!("expected a string, got {}", other)),
    }
}

/// Site and slot names: 2-60 alphanumerics and hyphens
pub fn web_app_name(name: &str) -> Result<(), String> {
    let len = name.chars().count();
    if !(2..=60).contains(&len) {
        return Err(format!("{:?} must be between 2 and 60 characters long", name));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(format!(
            "{:?} can only contain alphanumeric characters and dashes",
            name
        ));
    }
    Ok(())
}

pub fn function_app_id(id: &str) -> Result<(), String> {
    FunctionAppId::parse(id).map(|_| ()).map_err(|e| e.to_string())
}

pub fn user_assigned_identity_id(id: &str) -> Result<(), String> {
    UserAssignedIdentityId::parse(id).map(|_| ()).map_err(|e| e.to_string())
}

/// Storage account names: 3-24 lowercase letters and digits
pub fn storage_account_name(name: &str) -> Result<(), String> {
    let valid = (3..=24).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(format!(
            "{:?} must be 3-24 characters long and contain only lowercase letters and numbers",
            name
        ))
    }
}

/// Key Vault nested item id, version optional:
/// `https://{vault}.vault.azure.net/secrets/{name}[/{version}]`
pub fn key_vault_secret_id(id: &str) -> Result<(), String> {
    let parsed = url::Url::parse(id).map_err(|e| format!("{:?} is not a valid URL: {}", id, e))?;
    if parsed.scheme() != "https" {
        return Err(format!("{:?} must use https", id));
    }
    if parsed.host_str().unwrap_or_default().is_empty() {
        return Err(format!("{:?} has no Key Vault host", id));
    }
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        [_, _] | [_, _, _] => Ok(()),
        _ => Err(format!(
            "{:?} must be of the form https://{{vault}}/{{type}}/{{name}}[/{{version}}]",
            id
        )),
    }
}

fn no_zero_values(value: &Value) -> Result<(), String> {
    match value {
        Value::String(s) if s.is_empty() => Err("must not be empty".to_string()),
        _ => Ok(()),
    }
}

fn int_at_least(value: &Value, min: i64) -> Result<(), String> {
    match value.as_i64() {
        Some(n) if n < min => Err(format!("expected a value of at least {}, got {}", min, n)),
        _ => Ok(()),
    }
}

fn one_of(errors: &mut ValidationErrors, field: &str, value: &str, allowed: &[&str]) {
    if !value.is_empty() && !allowed.contains(&value) {
        errors.push(field, format!("{:?} must be one of {:?}", value, allowed));
    }
}

fn in_range(errors: &mut ValidationErrors, field: &str, value: i32, range: std::ops::RangeInclusive<i32>) {
    if !range.contains(&value) {
        errors.push(
            field,
            format!("expected {} to be in the range ({} - {})", value, range.start(), range.end()),
        );
    }
}

/// Constraints inside nested blocks
pub fn validate_nested(model: &LinuxFunctionAppSlotModel) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let config = &model.site_config;

    one_of(&mut errors, "site_config.ftps_state", &config.ftps_state, &["AllAllowed", "FtpsOnly", "Disabled"]);
    one_of(&mut errors, "site_config.minimum_tls_version", &config.minimum_tls_version, &["1.0", "1.1", "1.2"]);
    one_of(
        &mut errors,
        "site_config.scm_minimum_tls_version",
        &config.scm_minimum_tls_version,
        &["1.0", "1.1", "1.2"],
    );
    one_of(
        &mut errors,
        "site_config.load_balancing_mode",
        &config.load_balancing_mode,
        &[
            "WeightedRoundRobin",
            "LeastRequests",
            "LeastResponseTime",
            "WeightedTotalTraffic",
            "RequestHash",
            "PerSiteRoundRobin",
        ],
    );
    one_of(
        &mut errors,
        "site_config.managed_pipeline_mode",
        &config.managed_pipeline_mode,
        &["Classic", "Integrated"],
    );
    one_of(
        &mut errors,
        "site_config.remote_debugging_version",
        &config.remote_debugging_version,
        &["VS2017", "VS2019", "VS2022"],
    );
    if config.app_scale_limit < 0 {
        errors.push("site_config.app_scale_limit", "must be at least 0");
    }
    if config.worker_count < 0 {
        errors.push("site_config.worker_count", "must be at least 0");
    }
    in_range(&mut errors, "site_config.elastic_instance_minimum", config.elastic_instance_minimum, 0..=20);
    in_range(&mut errors, "site_config.pre_warmed_instance_count", config.pre_warmed_instance_count, 0..=20);
    if config.health_check_eviction_time_in_min != 0 {
        in_range(
            &mut errors,
            "site_config.health_check_eviction_time_in_min",
            config.health_check_eviction_time_in_min,
            2..=10,
        );
        if config.health_check_path.is_empty() {
            errors.push(
                "site_config.health_check_eviction_time_in_min",
                "requires site_config.health_check_path",
            );
        }
    }
    if let Some(web_app_url) = non_empty(&config.api_definition_url) {
        if url::Url::parse(web_app_url).is_err() {
            errors.push("site_config.api_definition_url", format!("{:?} is not a valid URL", web_app_url));
        }
    }

    match &config.application_stack {
        Some(ApplicationStack::Docker(docker)) => {
            if docker.registry_url.is_empty() || docker.image_name.is_empty() || docker.image_tag.is_empty() {
                errors.push(
                    "site_config.application_stack.docker",
                    "registry_url, image_name and image_tag are required",
                );
            }
        }
        Some(ApplicationStack::Dotnet { version, isolated }) => {
            one_of(
                &mut errors,
                "site_config.application_stack.dotnet.version",
                version,
                &["3.1", "6.0", "7.0"],
            );
            if *isolated && version == "3.1" {
                errors.push(
                    "site_config.application_stack.dotnet.isolated",
                    "the isolated worker requires .NET 6.0 or later",
                );
            }
        }
        Some(ApplicationStack::Node { version }) => {
            one_of(&mut errors, "site_config.application_stack.node.version", version, &["12", "14", "16", "18"]);
        }
        Some(ApplicationStack::Python { version }) => {
            one_of(
                &mut errors,
                "site_config.application_stack.python.version",
                version,
                &["3.6", "3.7", "3.8", "3.9", "3.10"],
            );
        }
        Some(ApplicationStack::Java { version }) => {
            one_of(&mut errors, "site_config.application_stack.java.version", version, &["8", "11", "17"]);
        }
        Some(ApplicationStack::PowershellCore { version }) => {
            one_of(
                &mut errors,
                "site_config.application_stack.powershell_core.version",
                version,
                &["7", "7.2"],
            );
        }
        Some(ApplicationStack::CustomHandler) | None => {}
    }

    for (i, restriction) in config.ip_restriction.iter().enumerate() {
        let field = format!("site_config.ip_restriction.{}", i);
        let targets = [
            &restriction.ip_address,
            &restriction.service_tag,
            &restriction.virtual_network_subnet_id,
        ]
        .iter()
        .filter(|v| !v.is_empty())
        .count();
        if targets != 1 {
            errors.push(
                field.clone(),
                "exactly one of ip_address, service_tag or virtual_network_subnet_id must be set",
            );
        }
        if restriction.priority < 1 {
            errors.push(format!("{}.priority", field), "must be at least 1");
        }
        one_of(&mut errors, &format!("{}.action", field), &restriction.action, &["Allow", "Deny"]);
    }

    for (i, conn) in model.connection_strings.iter().enumerate() {
        let field = format!("connection_strings.{}", i);
        if conn.name.is_empty() {
            errors.push(format!("{}.name", field), "must not be empty");
        }
        if conn.connection_type.is_empty() {
            errors.push(format!("{}.type", field), "must not be empty");
        }
        one_of(
            &mut errors,
            &format!("{}.type", field),
            &conn.connection_type,
            &[
                "APIHub",
                "Custom",
                "DocDb",
                "EventHub",
                "MySQL",
                "NotificationHub",
                "PostgreSQL",
                "RedisCache",
                "ServiceBus",
                "SQLAzure",
                "SQLServer",
            ],
        );
    }

    if let Some(auth) = &model.auth_settings {
        one_of(
            &mut errors,
            "auth_settings.unauthenticated_client_action",
            &auth.unauthenticated_client_action,
            &["AllowAnonymous", "RedirectToLoginPage"],
        );
        one_of(
            &mut errors,
            "auth_settings.default_provider",
            &auth.default_provider,
            &["AzureActiveDirectory", "Facebook", "Github", "Google", "MicrosoftAccount", "Twitter"],
        );
        if auth.token_refresh_extension_hours < 0.0 {
            errors.push("auth_settings.token_refresh_extension_hours", "must not be negative");
        }
    }

    if let Some(backup) = &model.backup {
        if backup.name.is_empty() {
            errors.push("backup.name", "must not be empty");
        }
        if backup.storage_account_url.is_empty() {
            errors.push("backup.storage_account_url", "must not be empty");
        }
        let schedule = &backup.schedule;
        in_range(&mut errors, "backup.schedule.frequency_interval", schedule.frequency_interval, 0..=1000);
        one_of(&mut errors, "backup.schedule.frequency_unit", &schedule.frequency_unit, &["Day", "Hour"]);
        if schedule.frequency_unit.is_empty() {
            errors.push("backup.schedule.frequency_unit", "must not be empty");
        }
        in_range(&mut errors, "backup.schedule.retention_period_days", schedule.retention_period_days, 0..=9999);
        if !schedule.start_time.is_empty() && chrono::DateTime::parse_from_rfc3339(&schedule.start_time).is_err() {
            errors.push(
                "backup.schedule.start_time",
                format!("{:?} is not an RFC 3339 timestamp", schedule.start_time),
            );
        }
    }

    if let Some(logs) = &config.app_service_logs {
        in_range(&mut errors, "site_config.app_service_logs.disk_quota_mb", logs.disk_quota_mb, 25..=100);
        if logs.retention_period_days < 0 {
            errors.push("site_config.app_service_logs.retention_period_days", "must be at least 0");
        }
    }

    if let Some(identity) = &model.identity {
        if identity.identity_type.has_user_assigned() && identity.identity_ids.is_empty() {
            errors.push("identity.identity_ids", "required when the type includes UserAssigned");
        }
        if identity.identity_type == IdentityType::SystemAssigned && !identity.identity_ids.is_empty() {
            errors.push("identity.identity_ids", "only valid when the type includes UserAssigned");
        }
        for id in &identity.identity_ids {
            if let Err(e) = user_assigned_identity_id(id) {
                errors.push("identity.identity_ids", e);
            }
        }
    }

    errors
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appservice::model::{Backup, IpRestriction};

    #[test]
    fn test_web_app_name() {
        assert!(web_app_name("staging-1").is_ok());
        assert!(web_app_name("a").is_err());
        assert!(web_app_name("under_score").is_err());
        assert!(web_app_name(&"a".repeat(61)).is_err());
    }

    #[test]
    fn test_storage_account_name() {
        assert!(storage_account_name("acct1").is_ok());
        assert!(storage_account_name("Acct1").is_err());
        assert!(storage_account_name("ab").is_err());
    }

    #[test]
    fn test_key_vault_secret_id() {
        assert!(key_vault_secret_id("https://kv1.vault.azure.net/secrets/storage").is_ok());
        assert!(key_vault_secret_id("https://kv1.vault.azure.net/secrets/storage/0123abcd").is_ok());
        assert!(key_vault_secret_id("https://kv1.vault.azure.net/secrets").is_err());
        assert!(key_vault_secret_id("http://kv1.vault.azure.net/secrets/storage").is_err());
        assert!(key_vault_secret_id("not a url").is_err());
    }

    #[test]
    fn test_lookup() {
        assert!(lookup("web_app_name").is_some());
        assert!(lookup("nope").is_none());
        let check = lookup("int_at_least_0").unwrap();
        assert!(check(&Value::from(-1)).is_err());
        assert!(check(&Value::from(0)).is_ok());
    }

    #[test]
    fn test_nested_ip_restriction_needs_one_target() {
        let mut model = LinuxFunctionAppSlotModel::default();
        model.site_config.ip_restriction.push(IpRestriction {
            ip_address: "10.0.0.0/24".to_string(),
            service_tag: "AzureFrontDoor.Backend".to_string(),
            ..Default::default()
        });
        let errors = validate_nested(&model);
        assert!(errors.mentions("site_config.ip_restriction.0"));
    }

    #[test]
    fn test_nested_backup() {
        let mut model = LinuxFunctionAppSlotModel::default();
        model.backup = Some(Backup {
            name: "nightly".to_string(),
            storage_account_url: "https://sa.blob.core.windows.net/backups?sig=x".to_string(),
            ..Default::default()
        });
        model.backup.as_mut().unwrap().schedule.frequency_interval = 1;
        model.backup.as_mut().unwrap().schedule.frequency_unit = "Week".to_string();
        let errors = validate_nested(&model);
        assert!(errors.mentions("backup.schedule.frequency_unit"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_nested(&LinuxFunctionAppSlotModel::default()).is_empty());
    }
}
