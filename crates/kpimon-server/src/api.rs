pub mod alerts;
pub mod analytics;
pub mod notifications;
pub mod pagination;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use kpimon_alert::AlertError;
use kpimon_analytics::AnalyticsError;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// API 错误响应
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// 错误码
    pub err_code: i32,
    /// 错误信息
    pub err_msg: String,
    /// 链路追踪 ID（默认空字符串）
    pub trace_id: String,
}

/// API 统一响应包裹
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 错误码（成功时为 0）
    pub err_code: i32,
    /// 错误信息（成功时为 success）
    pub err_msg: String,
    /// 链路追踪 ID（默认空字符串）
    pub trace_id: String,
    /// 业务数据（有数据时返回）
    pub data: Option<T>,
}

/// 分页数据结构
#[derive(Serialize, ToSchema)]
pub struct PaginatedData<T>
where
    T: Serialize,
{
    /// 数据项列表
    pub items: Vec<T>,
    /// 总数
    pub total: u64,
    /// 每页数量
    pub limit: usize,
    /// 偏移量
    pub offset: usize,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn success_empty_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: 0,
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

pub fn success_paginated_response<T>(
    status: StatusCode,
    trace_id: &str,
    items: Vec<T>,
    total: u64,
    limit: usize,
    offset: usize,
) -> Response
where
    T: Serialize,
{
    success_response(
        status,
        trace_id,
        PaginatedData {
            items,
            total,
            limit,
            offset,
        },
    )
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "not_found" => 1004,
        "conflict" => 1005,
        "internal_error" => 1500,
        "storage_error" => 1501,
        "upstream_error" => 1502,
        "deadline_exceeded" => 1503,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// 告警子系统错误到 HTTP 响应的映射。
pub fn alert_error_response(trace_id: &str, err: &AlertError) -> Response {
    match err {
        AlertError::Validation(msg) => {
            error_response(StatusCode::BAD_REQUEST, trace_id, "bad_request", msg)
        }
        AlertError::NotFound(msg) => {
            error_response(StatusCode::NOT_FOUND, trace_id, "not_found", msg)
        }
        AlertError::Storage(e) => {
            tracing::error!(error = %e, "Alert storage error");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 分析子系统错误到 HTTP 响应的映射。
///
/// 错误响应与成功的空结果可区分：失败的检查绝不会伪装成“无告警触发”。
pub fn analytics_error_response(trace_id: &str, err: &AnalyticsError) -> Response {
    match err {
        AnalyticsError::Upstream { stage, source } => {
            tracing::error!(stage, error = %source, "Analytics upstream query failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "upstream_error",
                &format!("'{stage}' query failed"),
            )
        }
        AnalyticsError::DeadlineExceeded { timeout_secs } => {
            tracing::error!(timeout_secs, "Analytics request deadline exceeded");
            error_response(
                StatusCode::GATEWAY_TIMEOUT,
                trace_id,
                "deadline_exceeded",
                "Analytics request deadline exceeded",
            )
        }
    }
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
struct HealthResponse {
    /// 服务版本号
    version: String,
    /// 运行时长（秒）
    uptime_secs: i64,
    /// 存储状态
    storage_status: String,
}

/// 获取服务健康状态。
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "服务健康状态", body = HealthResponse)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    let storage_status = match state.store.count_alert_rules().await {
        Ok(_) => "ok".to_string(),
        Err(_) => "degraded".to_string(),
    };
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            storage_status,
        },
    )
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .merge(analytics::routes())
        .merge(alerts::routes())
        .merge(notifications::routes())
}
