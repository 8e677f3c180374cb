use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

pub mod event;
pub mod history;
pub mod purchase;
pub mod rule;
pub mod session;

// ---- 公开 Row 类型（从各子模块重新导出）----
pub use event::EventRow;
pub use history::{AlertHistoryRow, UnreadNotification};
pub use purchase::{MonthAggregate, PurchaseRow};
pub use rule::{AlertRuleRow, AlertRuleUpdate};
pub use session::SessionRow;

/// 业务数据库的统一访问层。
///
/// 所有方法均为 `async fn`，底层使用 SeaORM + SQLite。
/// 原始记录（会话/事件/订单）由外部接入层写入；本层对核心引擎提供
/// 范围查询与聚合，对告警子系统提供规则与历史的读写。
pub struct BizStore {
    pub(crate) db: DatabaseConnection,
}

impl BizStore {
    /// 连接并初始化业务数据库。
    ///
    /// - `db_url`：完整的数据库连接 URL，由调用方（服务器配置）提供。
    ///   SQLite 示例：`sqlite:///data/kpimon.db?mode=rwc`
    ///
    /// 自动运行 `sea-orm-migration` 迁移，确保 Schema 最新。
    pub async fn new(db_url: &str) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        // WAL 模式仅对 SQLite 有效
        if db_url.starts_with("sqlite://") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        // 运行所有待执行迁移
        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized biz store (SeaORM)");

        Ok(Self { db })
    }

    /// 返回底层数据库连接引用（供子模块使用）。
    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
