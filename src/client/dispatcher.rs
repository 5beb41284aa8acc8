use std::time::Duration;

use http::header::AUTHORIZATION;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::client::error::ClientError;
use crate::client::request::{ApiResponse, RequestDescriptor};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::store::token_store::TokenStore;

static TRANSPORT_MSG: &str = "transport";

/// Attaches the stored access token and forwards the request to the transport.
/// Failures come back unchanged; classification happens elsewhere.
#[derive(Clone)]
pub struct RequestDispatcher {
    client: Client,
    base_url: Url,
    store: TokenStore,
}

impl RequestDispatcher {
    pub fn new(base_url: &str, timeout: Duration, store: TokenStore) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Transport)?;
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            store,
        })
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub async fn dispatch(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse, ClientError> {
        let metrics = get_metrics().await;
        let method = descriptor.method.as_str();
        let url = join_url(&self.base_url, &descriptor.url)?;

        let mut outgoing = descriptor.clone();
        // a replayed request already carries the refreshed token
        if !outgoing.headers.contains_key(AUTHORIZATION) {
            if let Some(token) = self.store.access_token().await? {
                outgoing.set_bearer(&token)?;
            }
        }

        let mut request = self.client.request(outgoing.method, url).headers(outgoing.headers);
        if let Some(body) = &outgoing.body {
            request = request.json(body);
        }

        debug!(
            "dispatching {} {} (retry: {})",
            method, descriptor.url, descriptor.is_retry
        );
        let start = get_instant();
        let response = request.send().await.inspect_err(|e| {
            warn!("{} {} transport failure: {}", method, descriptor.url, e);
            metrics.http_requests.with_label_values(&[method, TRANSPORT_MSG]).inc();
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        metrics
            .http_request_duration
            .with_label_values(&[method])
            .observe(start.elapsed().as_secs_f64());
        metrics
            .http_requests
            .with_label_values(&[method, status.as_str()])
            .inc();

        if !status.is_success() {
            debug!("{} {} failed with status {}", method, descriptor.url, status);
            return Err(ClientError::from_status(status, body));
        }
        Ok(ApiResponse { status, headers, body })
    }
}

/// Base urls are treated as directories so relative paths append to them.
pub fn parse_base_url(base_url: &str) -> Result<Url, ClientError> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    };
    Url::parse(&normalized)
        .map_err(|e| ClientError::InvalidRequest(format!("invalid base url '{}': {}", base_url, e)))
}

/// `/auth/login` against `http://host/api/v1/` yields `http://host/api/v1/auth/login`;
/// absolute urls are used as they are.
pub fn join_url(base: &Url, path: &str) -> Result<Url, ClientError> {
    if path.contains("://") {
        return Url::parse(path)
            .map_err(|e| ClientError::InvalidRequest(format!("invalid url '{}': {}", path, e)));
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| ClientError::InvalidRequest(format!("invalid path '{}': {}", path, e)))
}
