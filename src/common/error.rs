// Error types shared across the client

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::error;

/// Errors raised by the HTTP layer and the endpoint wrappers built on it
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not authenticated: no refresh token available")]
    NotAuthenticated,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Validation Error: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Token storage error: {0}")]
    Storage(#[from] TokenError),
}

/// Body returned by the server for 422 responses
#[derive(Debug, Deserialize)]
pub struct ValidationErrorBody {
    #[serde(default)]
    pub detail: Vec<ValidationDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ValidationDetail {
    #[serde(default)]
    pub msg: String,
}

impl ApiError {
    /// Builds an error from a non-success status and its body text
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(body.to_string()),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let messages = serde_json::from_str::<ValidationErrorBody>(body)
                    .map(|b| {
                        b.detail
                            .into_iter()
                            .map(|d| d.msg)
                            .filter(|m| !m.is_empty())
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                if messages.is_empty() {
                    ApiError::Validation(vec![body.to_string()])
                } else {
                    ApiError::Validation(messages)
                }
            }
            _ => {
                if status.is_server_error() {
                    error!(status = %status, "Server returned an error");
                }
                ApiError::Status {
                    status,
                    message: extract_message(body),
                }
            }
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Short message suitable for an inline, non-blocking notice
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized(_) | ApiError::NotAuthenticated | ApiError::RefreshFailed(_) => {
                "로그인이 만료되었습니다. 다시 로그인해주세요.".to_string()
            }
            ApiError::Validation(messages) => messages.join("\n"),
            ApiError::Transport(_) => {
                "서버와 통신 중 문제가 발생했습니다. 다시 시도해주세요.".to_string()
            }
            ApiError::Status { status, .. } if status.is_server_error() => {
                "서버 오류가 발생했습니다. 잠시 후 다시 시도해주세요.".to_string()
            }
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Decode(_) => "서버 응답을 처리하지 못했습니다.".to_string(),
            ApiError::Storage(_) => "로그인 정보를 저장하지 못했습니다.".to_string(),
        }
    }
}

// Prefers `detail` (string) then `message` from a JSON error body
fn extract_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    ["detail", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

/// Errors from the token persistence scopes
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Errors raised by a socket transport
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for SocketError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        SocketError::Protocol(e.to_string())
    }
}

/// Errors raised while decoding a socket payload into alerts
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Malformed alert payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unexpected alert payload shape: {0}")]
    Shape(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_422_collects_detail_messages() {
        let body = r#"{"detail":[{"msg":"전화번호 형식 오류","loc":["body","phonenumber"]},{"msg":"이름 누락"}]}"#;
        match ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, body) {
            ApiError::Validation(messages) => {
                assert_eq!(messages, vec!["전화번호 형식 오류", "이름 누락"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_422_with_unexpected_body_keeps_raw_text() {
        match ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad input") {
            ApiError::Validation(messages) => assert_eq!(messages, vec!["bad input"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_status_prefers_detail_then_message() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"detail":"이미 가입된 번호"}"#);
        assert_eq!(err.user_message(), "이미 가입된 번호");

        let err = ApiError::from_status(StatusCode::CONFLICT, r#"{"message":"중복"}"#);
        assert_eq!(err.user_message(), "중복");

        let err = ApiError::from_status(StatusCode::NOT_FOUND, "plain");
        assert_eq!(err.user_message(), "plain");
    }

    #[test]
    fn test_401_is_unauthorized() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "");
        assert!(err.is_unauthorized());
        assert!(!ApiError::NotAuthenticated.is_unauthorized());
    }

    #[test]
    fn test_server_errors_get_generic_message() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, r#"{"detail":"upstream"}"#);
        assert!(err.user_message().contains("서버 오류"));
    }
}
