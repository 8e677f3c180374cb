use anyhow::Result;
use chrono::Utc;
use kpimon_alert::AlertChecker;
use kpimon_analytics::AnalyticsService;
use kpimon_storage::BizStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;

use kpimon_server::app;
use kpimon_server::config::ServerConfig;
use kpimon_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    kpimon_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("kpimon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = ServerConfig::load(&config_path)?;

    tracing::info!(
        http_port = config.http_port,
        db = %config.database.url,
        "kpimon-server starting"
    );

    // Build components
    let store = Arc::new(BizStore::new(&config.database.url).await?);
    let analytics = Arc::new(AnalyticsService::new(
        store.clone(),
        config.analytics.to_config(),
    ));
    let checker = Arc::new(AlertChecker::new(store.clone()));

    let state = AppState {
        store,
        analytics: analytics.clone(),
        checker: checker.clone(),
        start_time: Utc::now(),
        config: Arc::new(config.clone()),
    };

    // HTTP/REST server
    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state);
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_server = axum::serve(http_listener, app);

    // Periodic alert check. When disabled an external scheduler (cron,
    // admin-side poll) is expected to call POST /v1/alerts/check.
    let check_handle = if config.alert_check.enabled {
        let interval_secs = config.alert_check.interval_secs;
        Some(tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(interval_secs));
            loop {
                tick.tick().await;
                let snapshot = match analytics.funnel_snapshot(None).await {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::error!(error = %e, "Scheduled check: snapshot failed");
                        continue;
                    }
                };
                match checker.run(&snapshot).await {
                    Ok(triggered) if !triggered.is_empty() => {
                        tracing::info!(count = triggered.len(), "Scheduled check triggered alerts")
                    }
                    Err(e) => tracing::error!(error = %e, "Scheduled alert check failed"),
                    _ => {}
                }
            }
        }))
    } else {
        tracing::info!("Periodic alert check disabled (external scheduler expected)");
        None
    };

    tracing::info!(http = %http_addr, "Server started");

    if let Err(e) = http_server
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await
    {
        tracing::error!(error = %e, "HTTP server error");
    }

    if let Some(h) = check_handle {
        h.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}
