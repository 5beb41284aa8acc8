//! Shared constants and invariants

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_REFRESH_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_STORAGE_NAMESPACE: &str = "@zonaazul";

// Persisted key suffixes, prefixed with the storage namespace
pub const KEY_ACCESS_TOKEN: &str = "token";
pub const KEY_REFRESH_TOKEN: &str = "refreshToken";
pub const KEY_USER: &str = "user";

// Auth routes
pub const ROUTE_LOGIN: &str = "/auth/login";
pub const ROUTE_REGISTER: &str = "/auth/register";
pub const ROUTE_REFRESH: &str = "/auth/refresh";
pub const ROUTE_REFRESH_TOKEN: &str = "/auth/refresh-token";
pub const ROUTE_LOGOUT: &str = "/auth/logout";
pub const ROUTE_CURRENT_USER: &str = "/users/me";

/// Routes whose own 401 responses never start a refresh cycle
pub const AUTH_ROUTES: [&str; 4] = [ROUTE_LOGIN, ROUTE_REGISTER, ROUTE_REFRESH_TOKEN, ROUTE_LOGOUT];

pub const BEARER_PREFIX: &str = "Bearer ";
pub const REFRESH_FAILED_FALLBACK: &str = "Token refresh failed";
pub const REQUEST_FAILED_FALLBACK: &str = "Erro ao processar solicitação";
