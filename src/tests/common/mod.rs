// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Json;
use serde_json::Value;
use tokio::sync::Notify;

use crate::client::api_client::ApiClient;
use crate::config::settings::ApiConfig;
use crate::events::session_events::SessionEvents;
use crate::session::session::Session;
use crate::store::kv::MemoryStore;
use crate::store::token_store::TokenStore;

pub const NAMESPACE: &str = "@zonaazul";
pub const PROTECTED_PATH: &str = "/parkings/active";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

#[derive(Clone, Debug)]
pub enum RefreshMode {
    Succeed(String),
    Fail(StatusCode, Value),
}

/// In-process stand-in for the parking API: one protected route, the auth
/// routes, and counters for everything the client does.
#[derive(Clone)]
pub struct FakeApi {
    pub refresh_calls: Arc<AtomicUsize>,
    pub logout_calls: Arc<AtomicUsize>,
    pub refresh_tokens_received: Arc<Mutex<Vec<String>>>,
    /// Authorization header of every protected call, in arrival order
    pub protected_auth: Arc<Mutex<Vec<Option<String>>>>,
    pub valid_token: Arc<Mutex<String>>,
    pub refresh_mode: Arc<Mutex<RefreshMode>>,
    pub always_unauthorized: Arc<AtomicBool>,
    pub user_role: Arc<Mutex<String>>,
    pub me_fails: Arc<AtomicBool>,
    gate_refresh: Arc<AtomicBool>,
    refresh_gate: Arc<Notify>,
}

impl FakeApi {
    pub fn new(valid_token: &str, refresh_mode: RefreshMode) -> Self {
        Self {
            refresh_calls: Arc::new(AtomicUsize::new(0)),
            logout_calls: Arc::new(AtomicUsize::new(0)),
            refresh_tokens_received: Arc::new(Mutex::new(Vec::new())),
            protected_auth: Arc::new(Mutex::new(Vec::new())),
            valid_token: Arc::new(Mutex::new(valid_token.to_string())),
            refresh_mode: Arc::new(Mutex::new(refresh_mode)),
            always_unauthorized: Arc::new(AtomicBool::new(false)),
            user_role: Arc::new(Mutex::new("driver".to_string())),
            me_fails: Arc::new(AtomicBool::new(false)),
            gate_refresh: Arc::new(AtomicBool::new(false)),
            refresh_gate: Arc::new(Notify::new()),
        }
    }

    /// Hold every refresh call until `release_refresh` is called.
    pub fn gated(self) -> Self {
        self.gate_refresh.store(true, Ordering::SeqCst);
        self
    }

    pub fn release_refresh(&self) {
        self.refresh_gate.notify_one();
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn protected_headers(&self) -> Vec<Option<String>> {
        self.protected_auth.lock().unwrap().clone()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/v1/parkings/active", get(protected))
            .route("/api/v1/users/me", get(current_user))
            .route("/api/v1/auth/refresh", post(refresh))
            .route("/api/v1/auth/login", post(login))
            .route("/api/v1/auth/register", post(login))
            .route("/api/v1/auth/refresh-token", post(unauthorized_route))
            .route("/api/v1/auth/logout", post(logout))
            .with_state(self.clone())
    }

    pub async fn spawn(&self) -> (JoinHandle<()>, String) {
        let (handle, addr) = spawn_axum(self.router()).await;
        (handle, format!("http://{}/api/v1", addr))
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.valid_token.lock().unwrap());
        !self.always_unauthorized.load(Ordering::SeqCst)
            && bearer_of(headers).as_deref() == Some(expected.as_str())
    }

    fn user_json(&self) -> Value {
        json!({
            "id": "u1",
            "email": "ana@example.com",
            "name": "Ana Souza",
            "role": self.user_role.lock().unwrap().clone(),
            "avatar": null,
            "emailVerified": true,
            "phoneVerified": true,
            "isActive": true,
            "createdAt": "2024-03-01T10:00:00.000Z",
            "updatedAt": "2024-03-02T10:00:00.000Z"
        })
    }
}

fn bearer_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn unauthorized_body() -> Json<Value> {
    Json(json!({"error": {"code": "UNAUTHORIZED", "message": "Token inválido ou expirado"}}))
}

async fn protected(State(api): State<FakeApi>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    api.protected_auth.lock().unwrap().push(bearer_of(&headers));
    if api.authorized(&headers) {
        (
            StatusCode::OK,
            Json(json!({"data": {"id": "p1", "plate": "ABC1D23", "status": "active"}})),
        )
    } else {
        (StatusCode::UNAUTHORIZED, unauthorized_body())
    }
}

async fn current_user(State(api): State<FakeApi>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if api.me_fails.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": {"message": "indisponível"}})),
        );
    }
    if api.authorized(&headers) {
        (StatusCode::OK, Json(json!({"data": api.user_json()})))
    } else {
        (StatusCode::UNAUTHORIZED, unauthorized_body())
    }
}

async fn refresh(State(api): State<FakeApi>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    api.refresh_calls.fetch_add(1, Ordering::SeqCst);
    api.refresh_tokens_received
        .lock()
        .unwrap()
        .push(body["refreshToken"].as_str().unwrap_or_default().to_string());

    if api.gate_refresh.load(Ordering::SeqCst) {
        api.refresh_gate.notified().await;
    }

    let mode = api.refresh_mode.lock().unwrap().clone();
    match mode {
        RefreshMode::Succeed(token) => {
            *api.valid_token.lock().unwrap() = token.clone();
            (StatusCode::OK, Json(json!({"token": token, "expiresIn": 3600})))
        }
        RefreshMode::Fail(status, body) => (status, Json(body)),
    }
}

async fn login(State(api): State<FakeApi>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] != "segredo123" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"code": "INVALID_CREDENTIALS", "message": "E-mail ou senha inválidos"}})),
        );
    }
    let token = api.valid_token.lock().unwrap().clone();
    (
        StatusCode::OK,
        Json(json!({
            "user": {
                "id": "u1",
                "email": "ana@example.com",
                "name": "Ana Souza",
                "role": api.user_role.lock().unwrap().clone()
            },
            "token": token,
            "refreshToken": "rt-login",
            "expiresIn": 900
        })),
    )
}

async fn unauthorized_route() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, unauthorized_body())
}

async fn logout(State(api): State<FakeApi>) -> StatusCode {
    api.logout_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

pub fn memory_token_store() -> (MemoryStore, TokenStore) {
    let kv = MemoryStore::new();
    let store = TokenStore::new(Arc::new(kv.clone()), NAMESPACE);
    (kv, store)
}

pub fn build_client(base_url: &str, store: TokenStore, events: SessionEvents) -> ApiClient {
    let mut api = ApiConfig::new(base_url);
    api.timeout_ms = Some(5_000);
    api.refresh_timeout_ms = Some(5_000);
    ApiClient::new(&api, store, events).expect("api client")
}

pub async fn seed_session(store: &TokenStore, access: &str, refresh: &str) {
    store.set(&Session::new(access, refresh)).await.unwrap();
}

/// Wait until `n` callers are queued on the in-flight refresh.
pub async fn wait_for_pending(client: &ApiClient, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while client.coordinator().pending().await < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("requests did not queue on the refresh in time");
}
