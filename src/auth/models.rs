//! Authentication data models

use serde::{Deserialize, Serialize};

/// JWT claims the client cares about. The access token is otherwise opaque.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry in epoch seconds
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Current credential pair. A missing refresh token means logged out,
/// whatever the access token says.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPair {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Some(access.into()),
            refresh: Some(refresh.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

/// Form body for `/login` and `/admin/login`
#[derive(Serialize, Debug)]
pub struct LoginForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub grant_type: &'static str,
}

impl<'a> LoginForm<'a> {
    pub fn password(username: &'a str, password: &'a str) -> Self {
        Self {
            username,
            password,
            grant_type: "password",
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// `/refresh` returns a new access token; a rotated refresh token is optional
#[derive(Deserialize, Debug, Clone)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// JSON body for `/register`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub name: String,
    pub password: String,
    pub address: String,
    pub gender: String,
    pub phonenumber: String,
    pub birth: String,
}

/// Raw signup input as typed by the user
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub password: String,
    pub confirm_password: String,
    pub phone: String,
    pub birth: String,
    pub address: String,
    pub gender: String,
}

/// Identity returned by `/me`
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Identity {
    #[serde(default, alias = "_id", alias = "id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Profile returned by `/api/userinfo`
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UserInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserInfo {
    /// Display name, falling back to a generic label
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("사용자")
    }
}

/// Outcome of restoring a session at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Active,
}
