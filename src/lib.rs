//! Azure App Service resources over Azure Resource Manager
//!
//! Two layers:
//!
//! - typed REST clients, one method per API operation ([`web`] on top of [`arm`])
//! - lifecycle adapters that map a desired-state record onto those calls
//!   ([`appservice`], driven through [`resource`])

pub mod appservice;
pub mod arm;
pub mod clients;
pub mod config;
pub mod error;
pub mod ids;
pub mod resource;
pub mod web;

pub use clients::Clients;
pub use error::{ProviderError, ReadOutcome};
