// src/services/api_client.rs
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::models::{RefreshRequest, RefreshResponse};
use crate::auth::token_store::TokenStore;
use crate::common::config::ClientConfig;
use crate::common::error::ApiError;
use crate::services::refresh::RefreshGate;

#[derive(Debug, Clone)]
enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// A replayable description of one API call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
    refresh_on_unauthorized: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            refresh_on_unauthorized: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let value =
            serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn form<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let value =
            serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        let pairs = value
            .as_object()
            .ok_or_else(|| ApiError::Decode("form body must be an object".to_string()))?
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect();
        self.body = RequestBody::Form(pairs);
        Ok(self)
    }

    /// A 401 on this request is returned as-is instead of triggering a refresh
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

struct Inner {
    http: Client,
    // No bearer header and no refresh handling; used only for `/refresh`
    refresh_http: Client,
    config: Arc<ClientConfig>,
    tokens: Arc<TokenStore>,
    gate: RefreshGate,
}

/// HTTP client that attaches the bearer token and transparently recovers
/// from access-token expiry with a single-flight refresh
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    /// Fails when the HTTP backend (TLS) cannot be initialized
    pub fn new(config: Arc<ClientConfig>, tokens: Arc<TokenStore>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to build HTTP client");
                ApiError::Transport(e)
            })?;
        let refresh_http = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                refresh_http,
                config,
                tokens,
                gate: RefreshGate::new(),
            }),
        })
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.inner.tokens
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Sends `request`, retrying it at most once after a successful refresh
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let (response, used_token) = self.dispatch(&request).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !request.refresh_on_unauthorized {
            return Self::check(response).await;
        }

        let body = response.text().await.unwrap_or_default();
        let original = ApiError::Unauthorized(body);

        // Another request may have refreshed while this one was in flight
        let current = self.inner.tokens.get_access_token();
        let already_refreshed = current.is_some() && current != used_token;

        if !already_refreshed {
            debug!(path = %request.path, "Access token rejected; refreshing");
            if let Err(e) = self.refresh().await {
                warn!(path = %request.path, error = %e, "Refresh failed; giving up on request");
                return Err(original);
            }
        }

        debug!(path = %request.path, "Retrying request with refreshed token");
        let (retried, _) = self.dispatch(&request).await?;
        Self::check(retried).await
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        response.json::<T>().await.map_err(|e| {
            error!(path = %path, error = %e, "Failed to decode response body");
            ApiError::Decode(e.to_string())
        })
    }

    /// Refreshes the access token through the single-flight gate. When the
    /// refresh itself fails the session is cleared.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.inner.gate.run(|| self.refresh_access_token()).await
    }

    async fn refresh_access_token(&self) -> Result<(), ApiError> {
        let Some(refresh_token) = self.inner.tokens.get_refresh_token() else {
            self.inner.tokens.clear_tokens();
            return Err(ApiError::NotAuthenticated);
        };

        match self.request_new_access(&refresh_token).await {
            Ok(body) => {
                let rotated = if self.inner.config.accept_rotated_refresh {
                    body.refresh_token.as_deref()
                } else {
                    None
                };
                let stored = self.inner.tokens.replace_access_if_current(
                    &refresh_token,
                    &body.access_token,
                    rotated,
                );
                if stored {
                    info!("Access token refreshed");
                }
                Ok(())
            }
            Err(e) => {
                self.inner.tokens.clear_if_current(&refresh_token);
                Err(e)
            }
        }
    }

    async fn request_new_access(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let response = self
            .inner
            .refresh_http
            .post(self.inner.config.endpoint("/refresh"))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send token refresh request");
                ApiError::RefreshFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, "Token refresh rejected");
            return Err(ApiError::RefreshFailed(format!("HTTP {}: {}", status, text)));
        }

        response
            .json::<RefreshResponse>()
            .await
            .map_err(|e| ApiError::RefreshFailed(e.to_string()))
    }

    fn build(&self, request: &ApiRequest) -> (RequestBuilder, Option<String>) {
        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), self.inner.config.endpoint(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(pairs) => builder.form(pairs),
        };

        // Read fresh on every dispatch so a retry picks up the refreshed token
        let token = self.inner.tokens.get_access_token();
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }
        (builder, token)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
    ) -> Result<(Response, Option<String>), ApiError> {
        let (builder, token) = self.build(request);
        let response = builder.send().await.map_err(|e| {
            warn!(path = %request.path, error = %e, "Request failed to send");
            ApiError::Transport(e)
        })?;
        debug!(
            method = %request.method,
            path = %request.path,
            status = %response.status(),
            "API response"
        );
        Ok((response, token))
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &text))
    }
}
