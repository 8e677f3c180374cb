use crate::state::AppState;
use crate::{api, logging};
use axum::middleware;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "kpimon API",
        description = "kpimon 业务健康指标与告警 REST API",
    ),
    tags(
        (name = "Health", description = "服务健康检查"),
        (name = "Analytics", description = "营收、留存与流失分析"),
        (name = "Alerts", description = "告警规则与检查"),
        (name = "Notifications", description = "未读通知队列")
    )
)]
struct ApiDoc;

pub fn build_http_app(state: AppState) -> Router {
    let (router, api_spec) = api::routes().split_for_parts();

    let mut merged_spec = ApiDoc::openapi();
    merged_spec.merge(api_spec);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/v1/openapi.json", merged_spec))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
