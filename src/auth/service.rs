use tracing::{info, warn};

use crate::auth::types::{
    DataEnvelope, LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequest, TokenResponse,
};
use crate::client::api_client::ApiClient;
use crate::client::error::ClientError;
use crate::client::request::RequestDescriptor;
use crate::session::session::User;
use crate::utils::constants::{
    ROUTE_CURRENT_USER, ROUTE_LOGIN, ROUTE_LOGOUT, ROUTE_REFRESH_TOKEN, ROUTE_REGISTER,
};

/// Thin wrappers around the auth endpoints. All of them go through the
/// authenticated client; the auth routes are excluded from refresh
/// coordination, so their failures come back on their own terms.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, ClientError> {
        info!("login attempt");
        self.api.post(ROUTE_LOGIN, credentials).await
    }

    pub async fn register(&self, data: &RegisterRequest) -> Result<LoginResponse, ClientError> {
        info!("register attempt");
        self.api.post(ROUTE_REGISTER, data).await
    }

    pub async fn current_user(&self) -> Result<User, ClientError> {
        let envelope: DataEnvelope<User> = self.api.get(ROUTE_CURRENT_USER).await?;
        Ok(envelope.data)
    }

    /// Server-side logout; a failure is logged and swallowed because the
    /// local session is cleared regardless.
    pub async fn logout(&self, refresh_token: &str) {
        let body = RefreshTokenRequest { refresh_token };
        let result = match RequestDescriptor::post(ROUTE_LOGOUT).json(&body) {
            Ok(request) => self.api.execute(request).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!("logout request failed: {}", e);
        }
    }

    /// Explicit refresh through `/auth/refresh-token`. Not used by the
    /// coordinator, which exchanges tokens on its own client.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, ClientError> {
        self.api
            .post(ROUTE_REFRESH_TOKEN, &RefreshTokenRequest { refresh_token })
            .await
    }
}
