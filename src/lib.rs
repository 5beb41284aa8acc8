//! # Zona Azul API client
//!
//! Authenticated HTTP client for the Zona Azul paid-parking API. Every
//! request carries the stored bearer token; expired sessions are refreshed
//! exactly once no matter how many requests fail at the same time, the
//! waiting requests are replayed, and an unrecoverable session is cleared
//! and announced on the session event channel.
//!
//! Modules:
//! - `client`: dispatcher, failure classifier, refresh coordinator
//! - `store`: key-value persistence and the token store on top of it
//! - `events`: session-invalidated notifications
//! - `auth`: auth endpoints and the identity layer
//! - `config`: YAML configuration, defaults and validation

pub mod auth;
pub mod client;
pub mod config;
pub mod events;
pub mod helpers;
pub mod observability;
pub mod session;
pub mod store;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::client::{ApiClient, ApiResponse, ClientError, RefreshError, RequestDescriptor};
pub use crate::config::settings::ClientConfig;
