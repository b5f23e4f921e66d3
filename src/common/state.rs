// Client state shared by every module that talks to the server

use std::sync::Arc;

use crate::auth::models::SessionState;
use crate::auth::token_store::TokenStore;
use crate::common::config::ClientConfig;
use crate::common::error::ApiError;
use crate::services::api_client::ApiClient;

/// Owns the configuration, the credential store and the HTTP client.
///
/// One context per logical session; tests build isolated ones with
/// [`ClientContext::in_memory`].
#[derive(Clone)]
pub struct ClientContext {
    pub config: Arc<ClientConfig>,
    pub tokens: Arc<TokenStore>,
    pub api: ApiClient,
}

impl ClientContext {
    /// Context persisting remembered sessions under `config.token_dir`
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let tokens = Arc::new(TokenStore::with_file(&config.token_dir));
        Self::with_store(config, tokens)
    }

    /// Context whose tokens never touch disk
    pub fn in_memory(config: ClientConfig) -> Result<Self, ApiError> {
        Self::with_store(config, Arc::new(TokenStore::in_memory()))
    }

    pub fn with_store(config: ClientConfig, tokens: Arc<TokenStore>) -> Result<Self, ApiError> {
        let config = Arc::new(config);
        let api = ApiClient::new(config.clone(), tokens.clone())?;
        Ok(Self {
            config,
            tokens,
            api,
        })
    }

    pub async fn bootstrap(&self) -> SessionState {
        crate::auth::handlers::bootstrap(&self.api).await
    }
}
