use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use kpimon_alert::AlertChecker;
use kpimon_analytics::AnalyticsService;
use kpimon_storage::BizStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<BizStore>,
    pub analytics: Arc<AnalyticsService>,
    pub checker: Arc<AlertChecker>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}
