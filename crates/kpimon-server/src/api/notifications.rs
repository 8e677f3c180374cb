use crate::api::pagination::deserialize_optional_u64;
use crate::api::{error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use kpimon_storage::UnreadNotification;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 200;

/// 未读通知
#[derive(Serialize, ToSchema)]
struct NotificationResponse {
    /// 通知唯一标识
    id: String,
    /// 规则唯一标识
    rule_id: String,
    /// 规则名称
    rule_name: String,
    /// 监控指标
    metric: String,
    /// 触发时的指标值
    metric_value: f64,
    /// 触发时的阈值
    threshold_value: f64,
    /// 告警消息
    message: String,
    /// 触发时间
    triggered_at: DateTime<Utc>,
}

impl From<UnreadNotification> for NotificationResponse {
    fn from(n: UnreadNotification) -> Self {
        Self {
            id: n.id,
            rule_id: n.rule_id,
            rule_name: n.rule_name,
            metric: n.metric,
            metric_value: n.metric_value,
            threshold_value: n.threshold_value,
            message: n.message,
            triggered_at: n.triggered_at,
        }
    }
}

/// 通知列表查询参数
#[derive(Debug, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct ListNotificationsParams {
    /// 返回条数上限（默认 20，最大 200）
    #[param(required = false)]
    #[serde(default, deserialize_with = "deserialize_optional_u64")]
    limit: Option<u64>,
}

/// 获取未读通知队列，按触发时间倒序。
#[utoipa::path(
    get,
    path = "/v1/notifications",
    tag = "Notifications",
    params(ListNotificationsParams),
    responses(
        (status = 200, description = "未读通知列表", body = Vec<NotificationResponse>)
    )
)]
async fn list_notifications(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<ListNotificationsParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    match state.store.list_unread_notifications(limit).await {
        Ok(rows) => {
            let items: Vec<NotificationResponse> =
                rows.into_iter().map(NotificationResponse::from).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list notifications");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 批量已读结果
#[derive(Serialize, ToSchema)]
struct MarkAllReadResponse {
    /// 本次置为已读的通知数
    updated: u64,
}

/// 将所有未读通知置为已读。全局操作，幂等：重复调用影响 0 行。
#[utoipa::path(
    post,
    path = "/v1/notifications/read-all",
    tag = "Notifications",
    responses(
        (status = 200, description = "已全部置为已读", body = MarkAllReadResponse)
    )
)]
async fn mark_all_read(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.mark_all_notifications_read().await {
        Ok(updated) => {
            tracing::info!(updated, "Marked all notifications read");
            success_response(StatusCode::OK, &trace_id, MarkAllReadResponse { updated })
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to mark notifications read");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_notifications))
        .routes(routes!(mark_all_read))
}
