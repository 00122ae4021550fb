//! Azure Resource Manager plumbing
//!
//! This module provides the core functionality for talking to the ARM REST
//! API: authentication, the HTTP transport, the typed operation codec and
//! long-running operation polling.
//!
//! # Module Structure
//!
//! - [`auth`] - Bearer token sources
//! - [`client`] - Main ARM client (token + transport)
//! - [`http`] - HTTP transport with retry on throttling
//! - [`codec`] - Operation descriptors, status checking and decoding
//! - [`poller`] - Waiting for long-running operations
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use azapps::arm::{auth::AzureCliCredential, client::ArmClient};
//!
//! fn example() -> anyhow::Result<()> {
//!     let client = ArmClient::new(
//!         "https://management.azure.com",
//!         "00000000-0000-0000-0000-000000000000",
//!         Arc::new(AzureCliCredential::new()),
//!     )?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod codec;
pub mod http;
pub mod poller;

pub use client::ArmClient;
pub use codec::{ApiError, Codec, Operation, OperationResponse};
pub use http::{ArmRequest, ArmResponse, Transport, TransportError};
pub use poller::{PollError, Poller};
