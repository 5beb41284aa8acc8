use std::sync::Arc;

use tracing::debug;

use crate::session::session::{Session, User};
use crate::store::kv::{KeyValueStore, StoreError};
use crate::utils::constants::{KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_USER};

/// Namespaced view of the key-value store holding the access token,
/// refresh token and cached user profile.
///
/// Cloning is cheap; every clone shares the same backend.
#[derive(Clone)]
pub struct TokenStore {
    kv: Arc<dyn KeyValueStore>,
    access_key: String,
    refresh_key: String,
    user_key: String,
}

impl TokenStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            kv,
            access_key: format!("{}:{}", namespace, KEY_ACCESS_TOKEN),
            refresh_key: format!("{}:{}", namespace, KEY_REFRESH_TOKEN),
            user_key: format!("{}:{}", namespace, KEY_USER),
        }
    }

    /// Both tokens, or None when either is missing
    pub async fn get(&self) -> Result<Option<Session>, StoreError> {
        let access = self.access_token().await?;
        let refresh = self.refresh_token().await?;
        Ok(access.zip(refresh).map(|(a, r)| Session::new(a, r)))
    }

    pub async fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.kv.get_item(&self.access_key).await
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.kv.get_item(&self.refresh_key).await
    }

    pub async fn set(&self, session: &Session) -> Result<(), StoreError> {
        self.kv.set_item(&self.access_key, &session.access_token).await?;
        self.kv.set_item(&self.refresh_key, &session.refresh_token).await
    }

    /// Replace only the access token; the refresh token is left as is.
    pub async fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        self.kv.set_item(&self.access_key, token).await
    }

    pub async fn user(&self) -> Result<Option<User>, StoreError> {
        match self.kv.get_item(&self.user_key).await? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    key: self.user_key.clone(),
                    reason: e.to_string(),
                }),
        }
    }

    pub async fn set_user(&self, user: &User) -> Result<(), StoreError> {
        let raw = serde_json::to_string(user)?;
        self.kv.set_item(&self.user_key, &raw).await
    }

    /// Remove access token, refresh token and cached user together.
    pub async fn clear(&self) -> Result<(), StoreError> {
        debug!("clearing token store");
        self.kv
            .multi_remove(&[&self.access_key, &self.refresh_key, &self.user_key])
            .await
    }
}
