//! Identity layer: the in-memory "who is logged in" state.
//!
//! It is the only subscriber that reacts to `SessionInvalidated` by
//! forgetting the current user; the token store has already been cleared by
//! the refresh coordinator when the event arrives.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::auth::service::AuthService;
use crate::auth::types::{LoginRequest, LoginResponse, RegisterRequest};
use crate::client::error::ClientError;
use crate::events::session_events::SessionEvent;
use crate::session::session::{Session, User};
use crate::store::kv::StoreError;
use crate::store::token_store::TokenStore;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Você não tem permissão para acessar este aplicativo.")]
    RoleNotAllowed,

    #[error("{}", .0.user_message())]
    Client(#[from] ClientError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Clone)]
pub struct Identity {
    auth: AuthService,
    user: Arc<RwLock<Option<User>>>,
}

impl Identity {
    pub fn new(auth: AuthService) -> Self {
        Self {
            auth,
            user: Arc::new(RwLock::new(None)),
        }
    }

    fn store(&self) -> &TokenStore {
        self.auth.api().store()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.user.read().await.is_some()
    }

    /// Subscribe to session events once and forget the user whenever the
    /// session is invalidated.
    pub fn start(&self) -> JoinHandle<()> {
        let mut rx = self.auth.api().events().subscribe();
        let user = self.user.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(SessionEvent::SessionInvalidated) => {
                        info!("session invalidated, user logged out");
                        *user.write().await = None;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // the outcome is the same however many were missed
                        warn!("session listener lagged by {} event(s)", skipped);
                        *user.write().await = None;
                    }
                    Err(RecvError::Closed) => {
                        debug!("session event channel closed");
                        break;
                    }
                }
            }
        })
    }

    /// Restore the persisted session: cached user first, then a background
    /// check against the server that keeps the cached user on failure.
    pub async fn check_session(&self) -> Result<Option<User>, IdentityError> {
        let store = self.store();
        if store.access_token().await?.is_none() {
            *self.user.write().await = None;
            return Ok(None);
        }
        let cached = match store.user().await {
            Ok(user) => user,
            Err(StoreError::Corrupt { key, reason }) => {
                error!("cached user '{}' is corrupt ({}), clearing session", key, reason);
                store.clear().await?;
                *self.user.write().await = None;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let Some(cached) = cached else {
            *self.user.write().await = None;
            return Ok(None);
        };
        *self.user.write().await = Some(cached.clone());

        match self.auth.current_user().await {
            Ok(fresh) => {
                store.set_user(&fresh).await?;
                *self.user.write().await = Some(fresh.clone());
                Ok(Some(fresh))
            }
            Err(e @ (ClientError::NoRefreshToken | ClientError::RefreshFailed { .. })) => {
                info!("stored session expired: {}", e);
                *self.user.write().await = None;
                Ok(None)
            }
            Err(e) => {
                // could be a network error; the user is logged out only when the session is really gone
                warn!("validating stored session failed: {}", e);
                Ok(self.current_user().await)
            }
        }
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<User, IdentityError> {
        let response = self.auth.login(credentials).await?;
        let user = self.establish(&response).await?;

        if !user.role.is_app_role() {
            warn!("role {:?} is not allowed in the app", user.role);
            self.store().clear().await?;
            *self.user.write().await = None;
            return Err(IdentityError::RoleNotAllowed);
        }
        Ok(user)
    }

    pub async fn register(&self, data: &RegisterRequest) -> Result<User, IdentityError> {
        let response = self.auth.register(data).await?;
        self.establish(&response).await
    }

    pub async fn logout(&self) -> Result<(), IdentityError> {
        let store = self.store();
        match store.refresh_token().await {
            Ok(Some(refresh_token)) => self.auth.logout(&refresh_token).await,
            Ok(None) => {}
            Err(e) => warn!("reading refresh token for logout failed: {}", e),
        }
        store.clear().await?;
        *self.user.write().await = None;
        info!("logged out");
        Ok(())
    }

    /// Persist the tokens, then load the full profile (falling back to the
    /// one embedded in the auth response) and cache it.
    async fn establish(&self, response: &LoginResponse) -> Result<User, IdentityError> {
        let store = self.store();
        store
            .set(&Session::new(&response.token, &response.refresh_token))
            .await?;

        let user = match self.auth.current_user().await {
            Ok(user) => user,
            Err(e) => {
                warn!("loading full profile failed, using auth response: {}", e);
                response.user.to_user()
            }
        };
        store.set_user(&user).await?;
        *self.user.write().await = Some(user.clone());
        Ok(user)
    }
}
