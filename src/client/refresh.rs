use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::client::dispatcher::{join_url, parse_base_url};
use crate::client::error::{refresh_failure_message, ClientError, RefreshError};
use crate::utils::constants::ROUTE_REFRESH;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Body returned by the refresh endpoint, not wrapped in `{ data }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub expires_in: u64,
}

/// Performs the refresh exchange on its own client, outside the
/// dispatcher, so a failed refresh can never re-enter the coordinator.
#[derive(Clone)]
pub struct RefreshClient {
    client: Client,
    url: Url,
}

impl RefreshClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Transport)?;
        let url = join_url(&parse_base_url(base_url)?, ROUTE_REFRESH)?;
        Ok(Self { client, url })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, RefreshError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| {
                error!("token refresh transport failure: {}", e);
                RefreshError::Failed {
                    message: refresh_failure_message("", Some(e.to_string())),
                    status: e.status(),
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            error!("token refresh failed with status {}: {}", status, body);
            return Err(RefreshError::Failed {
                message: refresh_failure_message(&body, Some(format!("HTTP {}", status))),
                status: Some(status),
            });
        }

        let parsed: RefreshResponse = serde_json::from_str(&body).map_err(|e| {
            error!("token refresh returned an unreadable body: {}", e);
            RefreshError::Failed {
                message: refresh_failure_message("", Some(e.to_string())),
                status: Some(status),
            }
        })?;
        info!("access token refreshed, expires in {}s", parsed.expires_in);
        Ok(parsed)
    }
}
