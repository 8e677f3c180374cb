use kpimon_analytics::AnalyticsConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub analytics: AnalyticsSection,
    #[serde(default)]
    pub alert_check: AlertCheckConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            database: DatabaseConfig::default(),
            analytics: AnalyticsSection::default(),
            alert_check: AlertCheckConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接 URL
    /// SQLite 示例：`sqlite://data/kpimon.db?mode=rwc`
    #[serde(default = "default_db_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSection {
    /// 默认统计窗口（天）
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,
    /// 单次聚合请求的总体超时（秒）
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 月度营收趋势子查询的最大并发数
    #[serde(default = "default_trend_concurrency")]
    pub trend_concurrency: usize,
}

impl Default for AnalyticsSection {
    fn default() -> Self {
        Self {
            default_window_days: default_window_days(),
            request_timeout_secs: default_request_timeout_secs(),
            trend_concurrency: default_trend_concurrency(),
        }
    }
}

impl AnalyticsSection {
    pub fn to_config(&self) -> AnalyticsConfig {
        AnalyticsConfig {
            default_window_days: self.default_window_days,
            request_timeout_secs: self.request_timeout_secs,
            trend_concurrency: self.trend_concurrency,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCheckConfig {
    /// 是否启用服务内置的周期性告警检查。
    /// 关闭时由外部调度器（cron / 管理端轮询）调用 check 接口。
    #[serde(default = "default_alert_check_enabled")]
    pub enabled: bool,
    /// 检查间隔（秒）
    #[serde(default = "default_alert_check_interval_secs")]
    pub interval_secs: u64,
}

impl Default for AlertCheckConfig {
    fn default() -> Self {
        Self {
            enabled: default_alert_check_enabled(),
            interval_secs: default_alert_check_interval_secs(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_db_url() -> String {
    "sqlite://data/kpimon.db?mode=rwc".to_string()
}

fn default_window_days() -> u32 {
    7
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_trend_concurrency() -> usize {
    4
}

fn default_alert_check_enabled() -> bool {
    false
}

fn default_alert_check_interval_secs() -> u64 {
    300
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
