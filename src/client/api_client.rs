use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::client::classifier::{classify, Classification};
use crate::client::coordinator::RefreshCoordinator;
use crate::client::dispatcher::RequestDispatcher;
use crate::client::error::ClientError;
use crate::client::refresh::RefreshClient;
use crate::client::request::{ApiResponse, RequestDescriptor};
use crate::config::settings::ApiConfig;
use crate::events::session_events::SessionEvents;
use crate::observability::metrics::get_metrics;
use crate::store::token_store::TokenStore;

/// Authenticated API client: every call goes through the dispatcher, and
/// expired-session failures are resolved by the refresh coordinator before
/// being replayed once.
#[derive(Clone)]
pub struct ApiClient {
    dispatcher: RequestDispatcher,
    coordinator: RefreshCoordinator,
    events: SessionEvents,
}

impl ApiClient {
    pub fn new(api: &ApiConfig, store: TokenStore, events: SessionEvents) -> Result<Self, ClientError> {
        let dispatcher = RequestDispatcher::new(
            &api.base_url,
            Duration::from_millis(api.timeout_ms()),
            store.clone(),
        )?;
        let refresher = RefreshClient::new(
            &api.base_url,
            Duration::from_millis(api.refresh_timeout_ms()),
        )?;
        let coordinator = RefreshCoordinator::new(store, events.clone(), refresher);
        Ok(Self {
            dispatcher,
            coordinator,
            events,
        })
    }

    pub fn store(&self) -> &TokenStore {
        self.dispatcher.store()
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<ApiResponse, ClientError> {
        let error = match self.dispatcher.dispatch(&descriptor).await {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };

        match classify(&error, &descriptor) {
            Classification::PassThrough => Err(error),
            Classification::RefreshEligible => {
                debug!(
                    "{} {} rejected with expired session, waiting for refresh",
                    descriptor.method, descriptor.url
                );
                let token = self.coordinator.handle().await?;

                let mut replay = descriptor;
                replay.is_retry = true;
                replay.set_bearer(&token)?;
                get_metrics().await.request_replays.inc();
                info!("replaying {} {} with refreshed token", replay.method, replay.url);
                self.dispatcher.dispatch(&replay).await
            }
        }
    }

    pub async fn send_json<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T, ClientError> {
        self.execute(descriptor).await?.json()
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        self.send_json(RequestDescriptor::get(url)).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T, ClientError> {
        self.send_json(RequestDescriptor::post(url).json(body)?).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T, ClientError> {
        self.send_json(RequestDescriptor::put(url).json(body)?).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T, ClientError> {
        self.send_json(RequestDescriptor::patch(url).json(body)?).await
    }

    pub async fn delete(&self, url: &str) -> Result<ApiResponse, ClientError> {
        self.execute(RequestDescriptor::delete(url)).await
    }
}
