use crate::client::error::ClientError;
use crate::client::request::RequestDescriptor;
use crate::utils::constants::AUTH_ROUTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// expired session on a first attempt; hand over to the refresh coordinator
    RefreshEligible,
    /// return the failure to the caller untouched
    PassThrough,
}

/// Only a 401 on a first attempt of a non-auth route may start or join a refresh cycle.
pub fn classify(error: &ClientError, descriptor: &RequestDescriptor) -> Classification {
    let unauthorized = matches!(error, ClientError::Authentication(_));
    if unauthorized && !descriptor.is_retry && !is_auth_route(&descriptor.url) {
        Classification::RefreshEligible
    } else {
        Classification::PassThrough
    }
}

pub fn is_auth_route(url: &str) -> bool {
    AUTH_ROUTES.iter().any(|route| url.contains(route))
}
