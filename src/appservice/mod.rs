//! App Service resources
//!
//! # Module Structure
//!
//! - [`model`] - Desired-state record
//! - [`schema`] / [`validate`] - Field table and validators
//! - [`expand`] / [`flatten`] - Record to wire model and back
//! - [`fx_version`] - `linuxFxVersion` codec
//! - [`app_settings`] / [`storage`] - Framework-managed app settings
//! - [`diff`] - Change sets for Update
//! - [`linux_function_app_slot`] - The lifecycle adapter

pub mod app_settings;
pub mod diff;
pub mod expand;
pub mod flatten;
pub mod fx_version;
pub mod linux_function_app_slot;
pub mod model;
pub mod schema;
pub mod storage;
pub mod validate;

pub use diff::{ChangeSet, Field};
pub use fx_version::LinuxFxVersion;
pub use linux_function_app_slot::LinuxFunctionAppSlot;
pub use model::LinuxFunctionAppSlotModel;
pub use schema::RESOURCE_TYPE;
