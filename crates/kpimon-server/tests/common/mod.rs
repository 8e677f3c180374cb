#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use kpimon_alert::AlertChecker;
use kpimon_analytics::AnalyticsService;
use kpimon_server::app;
use kpimon_server::config::ServerConfig;
use kpimon_server::state::AppState;
use kpimon_storage::{BizStore, EventRow, PurchaseRow, SessionRow};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub async fn build_test_context() -> Result<TestContext> {
    kpimon_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let db_url = format!(
        "sqlite://{}?mode=rwc",
        temp_dir.path().join("kpimon.db").display()
    );
    let store = Arc::new(BizStore::new(&db_url).await?);

    let config = ServerConfig::default();
    let analytics = Arc::new(AnalyticsService::new(
        store.clone(),
        config.analytics.to_config(),
    ));
    let checker = Arc::new(AlertChecker::new(store.clone()));

    let state = AppState {
        store,
        analytics,
        checker,
        start_time: Utc::now(),
        config: Arc::new(config),
    };
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

/// Sends a request and returns (status, parsed envelope).
pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub async fn seed_session(
    ctx: &TestContext,
    email: &str,
    completed: bool,
    signup: DateTime<Utc>,
    last: DateTime<Utc>,
) -> SessionRow {
    ctx.state
        .store
        .insert_session(&SessionRow {
            id: kpimon_common::id::next_id(),
            email: email.to_string(),
            completed,
            exit_step: if completed { None } else { Some(2) },
            created_at: signup,
            updated_at: last,
        })
        .await
        .unwrap()
}

pub async fn seed_event(ctx: &TestContext, session_id: &str, occurred_at: DateTime<Utc>) {
    ctx.state
        .store
        .insert_event(&EventRow {
            id: kpimon_common::id::next_id(),
            session_id: session_id.to_string(),
            category: "checkout".to_string(),
            occurred_at,
        })
        .await
        .unwrap();
}

pub async fn seed_purchase(ctx: &TestContext, amount: f64, status: &str, at: DateTime<Utc>) {
    ctx.state
        .store
        .insert_purchase(&PurchaseRow {
            id: kpimon_common::id::next_id(),
            amount,
            currency: "USD".to_string(),
            status: status.to_string(),
            purchased_at: at,
        })
        .await
        .unwrap();
}
