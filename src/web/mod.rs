//! `Microsoft.Web` REST clients
//!
//! Typed operations for the App Service resource provider. All clients in
//! this module share one API version.

pub mod models;
pub mod plans;
pub mod web_apps;

pub use plans::{AppServiceEnvironmentsClient, AppServicePlansClient};
pub use web_apps::WebAppsClient;

use crate::arm::codec::Codec;
use crate::arm::http::Transport;
use std::sync::Arc;

/// API version for every `Microsoft.Web` operation
pub const API_VERSION: &str = "2021-02-01";

/// Codec bound to [`API_VERSION`]
pub fn codec(transport: Arc<dyn Transport>) -> Codec {
    Codec::new(transport, API_VERSION)
}
