use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::store::kv::StoreError;
use crate::utils::constants::{REFRESH_FAILED_FALLBACK, REQUEST_FAILED_FALLBACK};

/// A non-2xx response, with the server's message already extracted.
#[derive(Debug, Clone)]
pub struct HttpFailure {
    pub status: StatusCode,
    pub code: Option<String>,
    pub message: String,
    pub body: String,
}

impl HttpFailure {
    pub fn from_response(status: StatusCode, body: String) -> Self {
        let fallback = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| REQUEST_FAILED_FALLBACK.to_string());
        let parsed = serde_json::from_str::<Value>(&body).ok();
        let code = parsed
            .as_ref()
            .and_then(|v| v.pointer("/error/code"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let message = parsed
            .as_ref()
            .and_then(format_api_error)
            .or_else(|| parsed.as_ref().and_then(|v| non_empty_str(v.get("message"))))
            .unwrap_or(fallback);
        Self { status, code, message, body }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// network failure or timeout; never refresh-eligible
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// 401 from the server
    #[error("authentication failed ({}): {}", .0.status, .0.message)]
    Authentication(HttpFailure),

    #[error("request failed ({}): {}", .0.status, .0.message)]
    Http(HttpFailure),

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("{message}")]
    RefreshFailed {
        message: String,
        status: Option<StatusCode>,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("cannot decode response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn from_status(status: StatusCode, body: String) -> Self {
        let failure = HttpFailure::from_response(status, body);
        if status == StatusCode::UNAUTHORIZED {
            ClientError::Authentication(failure)
        } else {
            ClientError::Http(failure)
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Authentication(f) | ClientError::Http(f) => Some(f.status),
            ClientError::RefreshFailed { status, .. } => *status,
            ClientError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Message suitable for showing to a user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Authentication(f) | ClientError::Http(f) => f.message.clone(),
            other => other.to_string(),
        }
    }
}

/// Outcome delivered to every caller waiting on a failed refresh cycle.
/// Cloned once per waiter so all of them see the same value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("{message}")]
    Failed {
        message: String,
        status: Option<StatusCode>,
    },
}

impl From<RefreshError> for ClientError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::NoRefreshToken => ClientError::NoRefreshToken,
            RefreshError::Failed { message, status } => ClientError::RefreshFailed { message, status },
        }
    }
}

/// Message for a rejected refresh call: `error.message`, then top-level
/// `message`, then the given fallback, then a generic text.
pub fn refresh_failure_message(body: &str, fallback: Option<String>) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let from_body = parsed.as_ref().and_then(|v| {
        non_empty_str(v.pointer("/error/message")).or_else(|| non_empty_str(v.get("message")))
    });
    from_body
        .or(fallback.filter(|m| !m.is_empty()))
        .unwrap_or_else(|| REFRESH_FAILED_FALLBACK.to_string())
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// Extract a readable message from the server's structured error payload
/// `{ "error": { "code", "message", "details" } }`.
///
/// Validation errors with details are rendered one line per field.
pub fn format_api_error(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    if error.get("code").and_then(Value::as_str) == Some("VALIDATION_ERROR") {
        let lines: Vec<String> = error
            .get("details")
            .and_then(Value::as_array)
            .map(|details| details.iter().filter_map(format_validation_detail).collect())
            .unwrap_or_default();
        if !lines.is_empty() {
            return Some(lines.join("\n"));
        }
    }
    error
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .or_else(|| Some(REQUEST_FAILED_FALLBACK.to_string()))
}

fn format_validation_detail(detail: &Value) -> Option<String> {
    let field = detail.get("field")?.as_str()?;
    let message = detail.get("message")?.as_str()?;
    let label = field
        .split('.')
        .map(field_label)
        .collect::<Vec<_>>()
        .join(" ");
    Some(format!("{}: {}", label, message))
}

fn field_label(part: &str) -> String {
    match part {
        "email" => "E-mail".to_string(),
        "password" => "Senha".to_string(),
        "confirmPassword" => "Confirmar senha".to_string(),
        "name" => "Nome".to_string(),
        "phone" => "Telefone".to_string(),
        "cpf" => "CPF".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}
