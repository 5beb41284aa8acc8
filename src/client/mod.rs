//! Authenticated HTTP client.
//!
//! Request flow: dispatcher → (on failure) classifier → (if eligible)
//! refresh coordinator → token store + session events → replay through
//! the dispatcher.

pub mod api_client;
pub mod classifier;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod refresh;
pub mod request;

pub use api_client::ApiClient;
pub use error::{ClientError, RefreshError};
pub use request::{ApiResponse, RequestDescriptor};
