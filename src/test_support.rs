// Shared fixtures for unit tests: loopback mock servers and token minting

use std::sync::Arc;

use axum::Router;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use crate::auth::models::Claims;
use crate::auth::token_store::TokenStore;
use crate::common::config::ClientConfig;
use crate::services::api_client::ApiClient;

/// Serves `router` on an ephemeral loopback port and returns its base URL
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    format!("http://{}", addr)
}

/// An HS256 token carrying `exp`
pub fn mint_token(exp: i64) -> String {
    let claims = Claims {
        sub: Some("test-user".to_string()),
        exp: Some(exp),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"test_secret_key"),
    )
    .expect("encode token")
}

pub fn client_for(base_url: &str) -> ApiClient {
    client_with(ClientConfig::new(base_url))
}

pub fn client_with(config: ClientConfig) -> ApiClient {
    let tokens = Arc::new(TokenStore::in_memory());
    ApiClient::new(Arc::new(config), tokens).expect("build HTTP client")
}
