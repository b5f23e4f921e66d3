// src/main.rs
use std::env;
use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{info, warn};

use eunbit::admin::handlers::{summary_line, StatusBoard};
use eunbit::admin::models::tier_label;
use eunbit::admin::services::{StatusPoller, DEFAULT_POLL_INTERVAL};
use eunbit::alerts::services::TerminalPresenter;
use eunbit::alerts::{AlertCenter, AlertMonitor};
use eunbit::auth::handlers::admin_login;
use eunbit::auth::SessionState;
use eunbit::common::config::apply_cli_override;
use eunbit::common::ConfigError;
use eunbit::services::monitoring::{Monitoring, MonitoringConfig};
use eunbit::socket::{SocketClient, SocketMount, SocketOptions, TungsteniteTransport};
use eunbit::{ClientConfig, ClientContext};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========================================================================
    // CONFIGURATION AND LOGGING
    // ========================================================================

    let config = apply_cli_override(ClientConfig::from_env()?);
    let monitoring = Monitoring::init(MonitoringConfig::from_client(&config));

    let ws_url = config
        .alert_ws_url
        .clone()
        .ok_or(ConfigError::Missing("ALERT_WS_URL"))?;
    let heartbeat = config.heartbeat_interval;
    let remember = config.remember;
    info!(api = %config.api_base_url, ws = %ws_url, remember, "Starting eunbit monitor");

    // ========================================================================
    // SESSION
    // ========================================================================

    let context = ClientContext::new(config)?;

    if context.bootstrap().await == SessionState::LoggedOut {
        let username = env::var("ADMIN_USERNAME").context("ADMIN_USERNAME is not set")?;
        let password = env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD is not set")?;
        if let Err(e) = admin_login(&context.api, &username, &password, remember).await {
            monitoring.log_error(&e, Some(json!({ "stage": "admin_login" })));
            anyhow::bail!(e.user_message());
        }
    }

    // ========================================================================
    // STATUS BOARD
    // ========================================================================

    let mut board = StatusBoard::default();
    match board.refresh(&context.api).await {
        Ok(_) => print_board(&board),
        Err(e) => {
            warn!("Status board unavailable: {}", e.user_message());
            monitoring.log_error(&e, Some(json!({ "stage": "allstatus" })));
        }
    }
    let board = Arc::new(RwLock::new(board));
    let poller = StatusPoller::start(context.api.clone(), board.clone(), DEFAULT_POLL_INTERVAL);

    // ========================================================================
    // ALERT SOCKET
    // ========================================================================

    let center = Arc::new(AlertCenter::new(context.api.clone()));
    let monitor = Arc::new(AlertMonitor::new(center.clone(), Arc::new(TerminalPresenter)));
    let client = Arc::new(SocketClient::new(
        SocketOptions::new(ws_url).heartbeat(heartbeat),
        Arc::new(TungsteniteTransport),
        monitor,
    ));
    let mount = SocketMount::new(client.clone());
    let ticket = mount.setup();

    monitoring.log_event("monitor_started", Some(json!({ "sentry": monitoring.sentry_enabled() })));
    info!("Monitoring alerts; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    // ========================================================================
    // TEARDOWN
    // ========================================================================

    info!(unread = center.unread_count(), "Shutting down");
    mount.release(ticket);
    client.shutdown().await;
    poller.shutdown().await;

    Ok(())
}

fn print_board(board: &StatusBoard) {
    let stats = board.stats();
    println!(
        "\n전체 {}명  고위험 {}명  중위험 {}명  정상 {}명",
        stats.total, stats.high, stats.middle, stats.safe
    );

    for (title, group) in [("고위험군", board.high_group()), ("중위험군", board.middle_group())] {
        println!("\n[{}]", title);
        if group.is_empty() {
            println!("  해당 없음");
        }
        for item in group {
            println!(
                "  {} ({}) {}  {}",
                item.name,
                tier_label(item.tier),
                item.time.as_deref().unwrap_or("방금 전"),
                summary_line(item)
            );
        }
    }
    println!();
}
