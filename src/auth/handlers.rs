//! Session operations against the authentication endpoints

use tracing::{debug, info, warn};

use super::models::{
    Identity, LoginForm, LoginResponse, RegisterRequest, SessionState, SignupForm, TokenPair,
    UserInfo,
};
use super::token_store::is_expired;
use super::validators::SignupValidator;
use crate::common::error::ApiError;
use crate::common::validation::Validator;
use crate::services::api_client::{ApiClient, ApiRequest};

/// Logs a regular user in and stores the issued pair in the scope picked by `remember`
pub async fn login(
    api: &ApiClient,
    username: &str,
    password: &str,
    remember: bool,
) -> Result<LoginResponse, ApiError> {
    password_login(api, "/login", username, password, remember).await
}

/// Same as [`login`] against the administrator endpoint
pub async fn admin_login(
    api: &ApiClient,
    username: &str,
    password: &str,
    remember: bool,
) -> Result<LoginResponse, ApiError> {
    password_login(api, "/admin/login", username, password, remember).await
}

async fn password_login(
    api: &ApiClient,
    path: &str,
    username: &str,
    password: &str,
    remember: bool,
) -> Result<LoginResponse, ApiError> {
    let request = ApiRequest::post(path)
        .form(&LoginForm::password(username, password))?
        .without_refresh();

    let response: LoginResponse = api.send_json(request).await.map_err(|e| {
        warn!(path = %path, error = %e, "Login failed");
        e
    })?;

    api.tokens().set_tokens(
        TokenPair::new(&response.access_token, &response.refresh_token),
        remember,
    )?;

    info!(path = %path, remember, "Login successful");
    Ok(response)
}

/// Validates the form locally, then submits it. A 422 from the server comes
/// back as [`ApiError::Validation`].
pub async fn register(api: &ApiClient, form: &SignupForm) -> Result<(), ApiError> {
    let result = SignupValidator.validate(form);
    if !result.is_valid {
        debug!(errors = result.errors.len(), "Signup form rejected locally");
        return Err(result.into());
    }

    let request = ApiRequest::post("/register")
        .json(&RegisterRequest::from(form))?
        .without_refresh();
    api.send(request).await?;

    info!("Registration submitted");
    Ok(())
}

/// Ends the session locally. The server has no logout endpoint yet.
pub fn logout(api: &ApiClient) {
    api.tokens().clear_tokens();
}

pub async fn me(api: &ApiClient) -> Result<Identity, ApiError> {
    api.send_json(ApiRequest::get("/me")).await
}

pub async fn user_info(api: &ApiClient) -> Result<UserInfo, ApiError> {
    api.send_json(ApiRequest::get("/api/userinfo")).await
}

/// Restores a session at startup.
///
/// No refresh token means logged out. A missing or expiring access token is
/// refreshed once; if that fails the stored credentials are wiped.
pub async fn bootstrap(api: &ApiClient) -> SessionState {
    let tokens = api.tokens();

    if tokens.get_refresh_token().is_none() {
        debug!("No refresh token stored; starting logged out");
        return SessionState::LoggedOut;
    }

    let needs_refresh = match tokens.get_access_token() {
        Some(access) => is_expired(&access),
        None => true,
    };

    if needs_refresh {
        if let Err(e) = api.refresh().await {
            warn!(error = %e, "Session restore failed; logged out");
            tokens.clear_tokens();
            return SessionState::LoggedOut;
        }
    }

    info!("Session restored");
    SessionState::Active
}
