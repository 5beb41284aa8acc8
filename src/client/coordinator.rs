//! Single-flight refresh of the access token.
//!
//! Every refresh-eligible failure calls [`RefreshCoordinator::handle`]. The
//! first one while `Idle` flips the state to `Refreshing` and starts a refresh
//! cycle; every later one only queues a waiter. The cycle writes the outcome to
//! the token store, returns to `Idle` and drains the whole queue in the same
//! critical section, then (on failure) publishes one `SessionInvalidated`.
//!
//! The cycle runs on its own task: a caller that stops waiting cannot leave
//! the coordinator stuck in `Refreshing`, its waiter is just resolved into the
//! void.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

use crate::client::error::RefreshError;
use crate::client::refresh::RefreshClient;
use crate::events::session_events::SessionEvents;
use crate::observability::metrics::get_metrics;
use crate::store::token_store::TokenStore;

static SUCCESS_MSG: &str = "success";
static FAILURE_MSG: &str = "failure";
static NO_REFRESH_TOKEN_MSG: &str = "no_refresh_token";

/// New access token, or the failure shared by the whole cycle.
pub type RefreshOutcome = Result<String, RefreshError>;

type Waiter = oneshot::Sender<RefreshOutcome>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}

struct RefreshState {
    phase: RefreshPhase,
    waiters: VecDeque<Waiter>,
}

struct Inner {
    state: Mutex<RefreshState>,
    store: TokenStore,
    events: SessionEvents,
    refresher: RefreshClient,
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(store: TokenStore, events: SessionEvents, refresher: RefreshClient) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(RefreshState {
                    phase: RefreshPhase::Idle,
                    waiters: VecDeque::new(),
                }),
                store,
                events,
                refresher,
            }),
        }
    }

    pub async fn phase(&self) -> RefreshPhase {
        self.inner.state.lock().await.phase
    }

    /// Callers currently waiting on the in-flight cycle
    pub async fn pending(&self) -> usize {
        self.inner.state.lock().await.waiters.len()
    }

    /// Join the in-flight refresh, starting one if none is running, and wait
    /// for its outcome.
    pub async fn handle(&self) -> RefreshOutcome {
        let (tx, rx) = oneshot::channel();
        let start_cycle = {
            let mut state = self.inner.state.lock().await;
            state.waiters.push_back(tx);
            match state.phase {
                RefreshPhase::Refreshing => {
                    debug!("refresh in flight, queued waiter #{}", state.waiters.len());
                    false
                }
                RefreshPhase::Idle => {
                    state.phase = RefreshPhase::Refreshing;
                    true
                }
            }
        };

        if start_cycle {
            tokio::spawn(self.clone().run_cycle());
        }

        rx.await.unwrap_or_else(|_| {
            Err(RefreshError::Failed {
                message: "token refresh was aborted".to_string(),
                status: None,
            })
        })
    }

    async fn run_cycle(self) {
        let metrics = get_metrics().await;
        info!("token refresh cycle started");

        let outcome = self.refresh_session().await;

        if outcome.is_err() {
            if let Err(e) = self.inner.store.clear().await {
                error!("clearing token store after failed refresh: {}", e);
            }
        }

        let waiters = {
            let mut state = self.inner.state.lock().await;
            state.phase = RefreshPhase::Idle;
            mem::take(&mut state.waiters)
        };
        metrics.token_refresh_waiters.observe(waiters.len() as f64);

        match &outcome {
            Ok(_) => {
                metrics.token_refresh.with_label_values(&[SUCCESS_MSG]).inc();
                info!("token refreshed, replaying {} request(s)", waiters.len());
            }
            Err(RefreshError::NoRefreshToken) => {
                metrics.token_refresh.with_label_values(&[NO_REFRESH_TOKEN_MSG]).inc();
                warn!("no refresh token stored, rejecting {} request(s)", waiters.len());
            }
            Err(e) => {
                metrics.token_refresh.with_label_values(&[FAILURE_MSG]).inc();
                warn!("token refresh failed ({}), rejecting {} request(s)", e, waiters.len());
            }
        }

        for waiter in waiters {
            // a dropped receiver means the caller stopped waiting
            let _ = waiter.send(outcome.clone());
        }

        if outcome.is_err() {
            self.inner.events.publish_invalidated().await;
        }
    }

    async fn refresh_session(&self) -> RefreshOutcome {
        let store = &self.inner.store;
        let refresh_token = match store.refresh_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(RefreshError::NoRefreshToken),
            Err(e) => {
                error!("reading refresh token: {}", e);
                return Err(RefreshError::Failed {
                    message: e.to_string(),
                    status: None,
                });
            }
        };

        let response = self.inner.refresher.refresh(&refresh_token).await?;

        // TODO: decide whether the server may rotate the refresh token; only the access token is replaced today.
        store
            .set_access_token(&response.token)
            .await
            .map_err(|e| {
                error!("storing refreshed access token: {}", e);
                RefreshError::Failed {
                    message: e.to_string(),
                    status: None,
                }
            })?;
        Ok(response.token)
    }
}
