use crate::api::pagination::PaginationParams;
use crate::api::{
    alert_error_response, analytics_error_response, error_response, success_empty_response,
    success_paginated_response, success_response,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use kpimon_alert::rules;
use kpimon_common::types::{CreateAlertRuleRequest, TriggeredAlert, UpdateAlertRuleRequest};
use kpimon_storage::AlertRuleRow;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

// ---- Alert Rules ----

/// 告警规则信息
#[derive(Serialize, ToSchema)]
pub struct AlertRuleResponse {
    /// 规则唯一标识
    pub id: String,
    /// 规则名称
    pub name: String,
    /// 监控指标（completion_rate / daily_sessions / conversion_rate / abandoned_rate）
    pub metric: String,
    /// 触发条件（below / above / change_percent）
    pub condition: String,
    /// 阈值
    pub threshold: f64,
    /// 业务分类标签
    pub category: Option<String>,
    /// 是否启用
    pub enabled: bool,
    /// 累计触发次数
    pub trigger_count: i64,
    /// 最近一次触发时间
    pub last_triggered_at: Option<DateTime<Utc>>,
    /// 触发冷却时间（秒）
    pub cooldown_secs: i64,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl From<AlertRuleRow> for AlertRuleResponse {
    fn from(r: AlertRuleRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            metric: r.metric,
            condition: r.condition,
            threshold: r.threshold,
            category: r.category,
            enabled: r.enabled,
            trigger_count: r.trigger_count,
            last_triggered_at: r.last_triggered_at,
            cooldown_secs: r.cooldown_secs,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// 分页查询告警规则列表。
/// 默认排序：`created_at` 倒序；默认分页：`limit=20&offset=0`。
#[utoipa::path(
    get,
    path = "/v1/alerts/rules",
    tag = "Alerts",
    params(PaginationParams),
    responses(
        (status = 200, description = "告警规则分页列表", body = Vec<AlertRuleResponse>)
    )
)]
async fn list_alert_rules(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state.store.count_alert_rules().await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count alert rules");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    match state.store.list_alert_rules(limit, offset).await {
        Ok(rows) => {
            let items: Vec<AlertRuleResponse> =
                rows.into_iter().map(AlertRuleResponse::from).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list alert rules");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 创建告警规则。
/// `name` / `metric_type` / `condition` / `threshold` 任一缺失或非法均返回
/// 校验错误，且不会写入任何数据。
#[utoipa::path(
    post,
    path = "/v1/alerts/rules",
    tag = "Alerts",
    request_body = CreateAlertRuleRequest,
    responses(
        (status = 201, description = "规则已创建", body = AlertRuleResponse),
        (status = 400, description = "请求校验失败", body = crate::api::ApiError)
    )
)]
async fn create_alert_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateAlertRuleRequest>,
) -> impl IntoResponse {
    match rules::create_rule(&state.store, &req).await {
        Ok(rule) => {
            tracing::info!(rule_id = %rule.id, name = %rule.name, "Alert rule created");
            success_response(StatusCode::CREATED, &trace_id, AlertRuleResponse::from(rule))
        }
        Err(e) => alert_error_response(&trace_id, &e),
    }
}

/// 获取单条告警规则详情。
#[utoipa::path(
    get,
    path = "/v1/alerts/rules/{id}",
    tag = "Alerts",
    params(("id" = String, Path, description = "告警规则 ID")),
    responses(
        (status = 200, description = "告警规则详情", body = AlertRuleResponse),
        (status = 404, description = "规则不存在", body = crate::api::ApiError)
    )
)]
async fn get_alert_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_alert_rule_by_id(&id).await {
        Ok(Some(rule)) => {
            success_response(StatusCode::OK, &trace_id, AlertRuleResponse::from(rule))
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Rule not found",
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to get alert rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 更新告警规则（部分字段）。
#[utoipa::path(
    put,
    path = "/v1/alerts/rules/{id}",
    tag = "Alerts",
    params(("id" = String, Path, description = "告警规则 ID")),
    request_body = UpdateAlertRuleRequest,
    responses(
        (status = 200, description = "规则已更新", body = AlertRuleResponse),
        (status = 400, description = "请求校验失败", body = crate::api::ApiError),
        (status = 404, description = "规则不存在", body = crate::api::ApiError)
    )
)]
async fn update_alert_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAlertRuleRequest>,
) -> impl IntoResponse {
    match rules::update_rule(&state.store, &id, &req).await {
        Ok(rule) => success_response(StatusCode::OK, &trace_id, AlertRuleResponse::from(rule)),
        Err(e) => alert_error_response(&trace_id, &e),
    }
}

/// 删除告警规则。
#[utoipa::path(
    delete,
    path = "/v1/alerts/rules/{id}",
    tag = "Alerts",
    params(("id" = String, Path, description = "告警规则 ID")),
    responses(
        (status = 200, description = "规则已删除"),
        (status = 404, description = "规则不存在", body = crate::api::ApiError)
    )
)]
async fn delete_alert_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match rules::delete_rule(&state.store, &id).await {
        Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "Rule deleted"),
        Err(e) => alert_error_response(&trace_id, &e),
    }
}

// ---- Check run ----

/// 一次检查的结果
#[derive(Serialize, ToSchema)]
struct CheckAlertsResponse {
    /// 本次评估使用的指标快照
    snapshot: kpimon_common::types::MetricSnapshot,
    /// 触发的告警
    triggered: Vec<TriggeredAlert>,
}

/// 立即执行一次告警检查：计算漏斗健康快照并逐条评估启用中的规则。
/// 评估失败会返回错误，与“无告警触发”的成功空结果可区分。
#[utoipa::path(
    post,
    path = "/v1/alerts/check",
    tag = "Alerts",
    responses(
        (status = 200, description = "检查完成", body = CheckAlertsResponse),
        (status = 500, description = "检查失败", body = crate::api::ApiError)
    )
)]
async fn check_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let snapshot = match state.analytics.funnel_snapshot(None).await {
        Ok(s) => s,
        Err(e) => return analytics_error_response(&trace_id, &e),
    };

    match state.checker.run(&snapshot).await {
        Ok(triggered) => success_response(
            StatusCode::OK,
            &trace_id,
            CheckAlertsResponse { snapshot, triggered },
        ),
        Err(e) => alert_error_response(&trace_id, &e),
    }
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_alert_rules, create_alert_rule))
        .routes(routes!(
            get_alert_rule,
            update_alert_rule,
            delete_alert_rule
        ))
        .routes(routes!(check_alerts))
}
