//! Property-based tests using proptest
//!
//! These tests check identifier parsing, the `linuxFxVersion` codec and the
//! expand/flatten pair against randomized inputs.

use azapps::appservice::expand::{self, ExpandContext};
use azapps::appservice::flatten::{self, RemoteSnapshot};
use azapps::appservice::fx_version;
use azapps::appservice::model::{ApplicationStack, DockerStack, LinuxFunctionAppSlotModel};
use azapps::appservice::storage::StorageConnection;
use azapps::appservice::LinuxFxVersion;
use azapps::ids::{FunctionAppSlotId, ResourceId};
use azapps::web::models::{Site, SiteProperties, StringDictionary};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn arb_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9-]{0,30}"
}

fn arb_slot_id() -> impl Strategy<Value = FunctionAppSlotId> {
    (
        "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
        "[a-zA-Z0-9_.()-]{1,40}",
        arb_name(),
        arb_name(),
    )
        .prop_map(|(sub, rg, site, slot)| FunctionAppSlotId::new(&sub, &rg, &site, &slot))
}

fn arb_version() -> impl Strategy<Value = String> {
    "[0-9]{1,2}(\\.[0-9]{1,2})?"
}

/// Every language stack; Docker and custom handlers are covered separately
fn arb_language_stack() -> impl Strategy<Value = ApplicationStack> {
    prop_oneof![
        (arb_version(), any::<bool>()).prop_map(|(version, isolated)| ApplicationStack::Dotnet { version, isolated }),
        arb_version().prop_map(|version| ApplicationStack::Node { version }),
        arb_version().prop_map(|version| ApplicationStack::Python { version }),
        arb_version().prop_map(|version| ApplicationStack::Java { version }),
        arb_version().prop_map(|version| ApplicationStack::PowershellCore { version }),
    ]
}

fn arb_docker() -> impl Strategy<Value = DockerStack> {
    (
        "[a-z][a-z0-9]{2,15}\\.azurecr\\.io",
        "[a-z][a-z0-9]{0,10}(/[a-z][a-z0-9]{0,10})?",
        "[a-z0-9][a-z0-9.]{0,10}",
    )
        .prop_map(|(host, image_name, image_tag)| DockerStack {
            registry_url: format!("https://{}", host),
            image_name,
            image_tag,
            registry_username: String::new(),
            registry_password: String::new(),
        })
}

/// User settings whose keys never collide with framework-managed ones
fn arb_user_settings() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("user_[a-z0-9_]{1,12}", "[ -~]{0,30}", 0..10)
}

proptest! {
    /// Formatting then parsing a slot ID gives the same ID back
    #[test]
    fn slot_id_round_trips(id in arb_slot_id()) {
        let printed = id.id();
        let parsed = FunctionAppSlotId::parse(&printed).unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// Strict parsing rejects re-cased keywords; insensitive parsing accepts them
    #[test]
    fn recased_keywords_need_insensitive_parse(id in arb_slot_id()) {
        let recased = id.id().replace("/resourceGroups/", "/resourcegroups/");
        prop_assert!(FunctionAppSlotId::parse(&recased).is_err());
        prop_assert_eq!(FunctionAppSlotId::parse_insensitively(&recased).unwrap(), id);
    }

    /// Any other path never parses as a slot ID
    #[test]
    fn short_paths_are_rejected(id in arb_slot_id()) {
        let parent = id.parent().id();
        prop_assert!(FunctionAppSlotId::parse(&parent).is_err());
        prop_assert!(FunctionAppSlotId::parse_insensitively(&parent).is_err());
    }

    /// Language stacks survive encoding, in any tag case
    #[test]
    fn language_stack_round_trips(stack in arb_language_stack(), upper in any::<bool>()) {
        let mut encoded = fx_version::encode(Some(&stack));
        if upper {
            let (tag, version) = encoded.split_once('|').unwrap();
            encoded = format!("{}|{}", tag.to_uppercase(), version);
        }
        prop_assert_eq!(fx_version::decode(&encoded, None).unwrap(), Some(stack));
    }

    /// Tagged values print and parse symmetrically
    #[test]
    fn tagged_value_round_trips(stack in arb_language_stack()) {
        let fx = LinuxFxVersion::from(Some(&stack));
        let reparsed: LinuxFxVersion = fx.to_string().parse().unwrap();
        prop_assert_eq!(reparsed, fx);
    }

    /// Docker images are recovered when the registry settings are known
    #[test]
    fn docker_stack_round_trips(docker in arb_docker()) {
        let stack = ApplicationStack::Docker(docker.clone());
        let encoded = fx_version::encode(Some(&stack));
        prop_assert!(encoded.starts_with("DOCKER|"));
        prop_assert!(!encoded.contains("https://"));
        prop_assert_eq!(fx_version::decode(&encoded, Some(&docker)).unwrap(), Some(stack));
    }

    /// Strings without a separator are never silently accepted
    #[test]
    fn missing_separator_is_rejected(value in "[A-Za-z0-9.]{1,20}") {
        prop_assert!(value.parse::<LinuxFxVersion>().is_err());
    }

    /// User settings and the storage account come back from the wire
    /// unchanged, with framework keys lifted into their own fields
    #[test]
    fn app_settings_survive_expand_and_flatten(
        user in arb_user_settings(),
        account in "[a-z0-9]{3,24}",
        key in "[A-Za-z0-9+/]{20,40}",
        builtin_logging in any::<bool>(),
        id in arb_slot_id(),
    ) {
        let model = LinuxFunctionAppSlotModel {
            name: id.slot_name.clone(),
            function_app_id: id.parent().id(),
            storage_account_name: account.clone(),
            storage_account_access_key: key.clone(),
            builtin_logging_enabled: builtin_logging,
            app_settings: user.clone(),
            ..Default::default()
        };
        let storage = StorageConnection::from_model(&model, "core.windows.net");
        let ctx = ExpandContext {
            functions_extension_version: &model.functions_extension_version,
            storage: &storage,
        };
        let user_settings = expand::create_app_settings(&model, &storage, false);
        let config = expand::expand_with_user_settings(&model, None, &ctx, &user_settings);

        let remote: BTreeMap<String, Option<String>> = config
            .app_settings
            .unwrap_or_default()
            .into_iter()
            .filter_map(|pair| Some((pair.name?, pair.value)))
            .collect();
        let snapshot = RemoteSnapshot {
            site: Site {
                properties: Some(SiteProperties::default()),
                ..Default::default()
            },
            app_settings: StringDictionary { properties: Some(remote) },
            ..Default::default()
        };

        let state = flatten::flatten(&id, &snapshot, None);
        prop_assert_eq!(state.app_settings, user);
        prop_assert_eq!(state.storage_account_name, account);
        prop_assert_eq!(state.storage_account_access_key, key);
        prop_assert_eq!(state.builtin_logging_enabled, builtin_logging);
        prop_assert_eq!(state.functions_extension_version, "~4");
        prop_assert_eq!(state.name, id.slot_name);
    }
}
