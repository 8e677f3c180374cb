use crate::api::{analytics_error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use kpimon_analytics::AnalyticsOverview;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 分析概览查询参数
#[derive(Debug, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct AnalyticsParams {
    /// 统计窗口（天，默认 7）
    #[param(required = false)]
    days: Option<u32>,
}

/// 获取综合分析概览：营收报表、队列留存、流失率。
/// 每次请求均从存储重新计算，无缓存。
#[utoipa::path(
    get,
    path = "/v1/analytics",
    tag = "Analytics",
    params(AnalyticsParams),
    responses(
        (status = 200, description = "分析概览", body = AnalyticsOverview),
        (status = 500, description = "上游查询失败", body = crate::api::ApiError),
        (status = 504, description = "聚合超时", body = crate::api::ApiError)
    )
)]
async fn get_analytics(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> impl IntoResponse {
    match state.analytics.overview(params.days).await {
        Ok(overview) => success_response(StatusCode::OK, &trace_id, overview),
        Err(e) => analytics_error_response(&trace_id, &e),
    }
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(get_analytics))
}
