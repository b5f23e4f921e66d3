// src/common/config.rs
//! Client configuration loaded once at startup from the environment

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ConfigError;

pub const DEFAULT_HEARTBEAT_SECS: u64 = 25;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub alert_ws_url: Option<String>,
    pub token_dir: PathBuf,
    /// Store a rotated refresh token when the refresh endpoint returns one
    pub accept_rotated_refresh: bool,
    pub heartbeat_interval: Duration,
    pub request_timeout: Duration,
    pub remember: bool,
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Minimal configuration pointing at `api_base_url`, with defaults elsewhere
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            alert_ws_url: None,
            token_dir: PathBuf::from("./.eunbit"),
            accept_rotated_refresh: true,
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            remember: false,
            sentry_dsn: None,
        }
    }

    /// Loads `.env` if present, then reads the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let api_base_url =
            env::var("API_BASE_URL").map_err(|_| ConfigError::Missing("API_BASE_URL"))?;
        let mut config = Self::new(api_base_url);

        config.alert_ws_url = env::var("ALERT_WS_URL").ok().filter(|s| !s.is_empty());

        if let Ok(dir) = env::var("TOKEN_DIR") {
            config.token_dir = PathBuf::from(dir);
        }

        // ACCEPT_ROTATED_REFRESH - set to "false" to always keep the original refresh token
        if let Ok(flag) = env::var("ACCEPT_ROTATED_REFRESH") {
            config.accept_rotated_refresh = flag.to_lowercase() != "false";
        }

        if let Ok(secs) = env::var("HEARTBEAT_SECS") {
            config.heartbeat_interval = Duration::from_secs(parse_secs("HEARTBEAT_SECS", &secs)?);
        }

        if let Ok(secs) = env::var("REQUEST_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_secs("REQUEST_TIMEOUT_SECS", &secs)?);
        }

        config.remember = env::var("REMEMBER_ME")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        config.sentry_dsn = env::var("SENTRY_DSN").ok().filter(|s| !s.is_empty());

        Ok(config)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}

fn parse_secs(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

/// CLI argument parsing for the remember-me flag
pub fn parse_remember_args() -> Option<bool> {
    parse_remember_from(env::args())
}

fn parse_remember_from(args: impl IntoIterator<Item = String>) -> Option<bool> {
    let mut result = None;
    for arg in args {
        match arg.as_str() {
            "--remember" | "--remember-me" => result = Some(true),
            "--no-remember" | "--session-only" => result = Some(false),
            _ => {}
        }
    }
    result
}

/// Override the remember flag from CLI args
pub fn apply_cli_override(mut config: ClientConfig) -> ClientConfig {
    if let Some(remember) = parse_remember_args() {
        tracing::info!(remember, "CLI override: REMEMBER_ME");
        config.remember = remember;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = ClientConfig::new("http://localhost:8000/");
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.endpoint("/login"), "http://localhost:8000/login");
        assert_eq!(config.endpoint("api/chat"), "http://localhost:8000/api/chat");
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://x");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(25));
        assert!(config.accept_rotated_refresh);
        assert!(!config.remember);
    }

    #[test]
    fn test_parse_secs_rejects_zero_and_garbage() {
        assert!(parse_secs("HEARTBEAT_SECS", "0").is_err());
        assert!(parse_secs("HEARTBEAT_SECS", "abc").is_err());
        assert_eq!(parse_secs("HEARTBEAT_SECS", " 10 ").unwrap(), 10);
    }

    #[test]
    fn test_remember_args_last_flag_wins() {
        let args = vec!["bin".to_string(), "--remember".to_string()];
        assert_eq!(parse_remember_from(args), Some(true));

        let args = vec![
            "bin".to_string(),
            "--remember".to_string(),
            "--no-remember".to_string(),
        ];
        assert_eq!(parse_remember_from(args), Some(false));

        assert_eq!(parse_remember_from(vec!["bin".to_string()]), None);
    }
}
