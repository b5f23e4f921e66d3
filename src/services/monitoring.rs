// Logging and Sentry error tracking for the client binaries
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::common::config::ClientConfig;

#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub sentry_dsn: Option<String>,
    pub environment: String,
    pub log_filter: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            sentry_dsn: None,
            environment: "development".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl MonitoringConfig {
    pub fn from_client(config: &ClientConfig) -> Self {
        Self {
            sentry_dsn: config.sentry_dsn.clone(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            ..Self::default()
        }
    }
}

/// Keeps Sentry alive for as long as it is held
pub struct Monitoring {
    sentry_guard: Option<sentry::ClientInitGuard>,
}

impl Monitoring {
    /// Installs the global tracing subscriber and, when a DSN is configured,
    /// the Sentry client with its tracing layer.
    pub fn init(config: MonitoringConfig) -> Self {
        let sentry_guard = init_sentry(&config);

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
        let registry = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false));

        let installed = if sentry_guard.is_some() {
            registry.with(sentry_tracing::layer()).try_init()
        } else {
            registry.try_init()
        };
        if installed.is_err() {
            // A subscriber was already set (tests, embedding application)
            return Self { sentry_guard };
        }

        if sentry_guard.is_some() {
            info!(environment = %config.environment, "Sentry initialized successfully");
        } else {
            info!("Sentry DSN not configured");
        }
        Self { sentry_guard }
    }

    pub fn sentry_enabled(&self) -> bool {
        self.sentry_guard.is_some()
    }

    /// Log an error with context
    pub fn log_error(&self, error: &dyn std::error::Error, context: Option<Value>) {
        error!(error = %error, "Error occurred");

        if let Some(context) = context {
            sentry::configure_scope(|scope| {
                scope.set_extra("error_context", context);
            });
        }
        sentry::capture_error(error);
    }

    /// Record a breadcrumb for later error reports
    pub fn log_event(&self, event: &str, data: Option<Value>) {
        info!(event = %event, "Event");

        let mut breadcrumb = sentry::Breadcrumb {
            ty: "default".into(),
            level: sentry::Level::Info,
            message: Some(event.to_string()),
            ..Default::default()
        };
        if let Some(Value::Object(map)) = data {
            for (key, value) in map {
                breadcrumb.data.insert(key, value);
            }
        }
        sentry::add_breadcrumb(breadcrumb);
    }
}

impl Drop for Monitoring {
    fn drop(&mut self) {
        if self.sentry_guard.is_some() {
            info!("Shutting down Sentry");
        }
    }
}

fn init_sentry(config: &MonitoringConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref().filter(|dsn| !dsn.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.environment.clone().into()),
            ..Default::default()
        },
    ));
    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitoringConfig::default();
        assert_eq!(config.log_filter, "info");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_no_dsn_means_no_sentry() {
        let mut config = MonitoringConfig::default();
        assert!(init_sentry(&config).is_none());

        config.sentry_dsn = Some(String::new());
        assert!(init_sentry(&config).is_none());
    }

    #[test]
    fn test_dsn_carried_from_client_config() {
        let mut client = ClientConfig::new("http://localhost:8000");
        client.sentry_dsn = Some("https://key@sentry.example/1".to_string());
        let config = MonitoringConfig::from_client(&client);
        assert_eq!(config.sentry_dsn, client.sentry_dsn);
    }
}
