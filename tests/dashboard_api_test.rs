//! 仪表板查询、设置与系统接口集成测试

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{TestApp, json_request};
use entity::{IngestionLogs, ingestion_logs};
use pretty_assertions::assert_eq;
use sd_monitor::AppConfig;
use sd_monitor::app::AppContext;
use sd_monitor::management::{AppState, build_router};
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

async fn seed_log(app: &TestApp, source: &str, status: &str, minutes_ago: i64) {
    let log = ingestion_logs::ActiveModel {
        id: Set(Uuid::new_v4()),
        source_type: Set(source.to_string()),
        status: Set(status.to_string()),
        records_count: Set(3),
        error_message: Set((status == "error").then(|| "disk full".to_string())),
        source_ip: Set(Some("10.0.0.9".to_string())),
        created_at: Set(Utc::now() - Duration::minutes(minutes_ago)),
    };
    IngestionLogs::insert(log)
        .exec_without_returning(app.db.as_ref())
        .await
        .unwrap();
}

#[tokio::test]
async fn logs_filtered_by_source_with_page_stats() {
    let app = TestApp::new().await;
    seed_log(&app, "vm_failover", "success", 1).await;
    seed_log(&app, "vm_failover", "error", 2).await;
    seed_log(&app, "vm_failover", "success", 3).await;
    seed_log(&app, "backup", "success", 4).await;

    let response = app
        .get("/api/ingestion/logs?source_type=vm_failover&limit=10")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["logs"].as_array().unwrap().len(), 3);
    assert_eq!(
        body["stats"],
        json!({ "total": 3, "success": 2, "error": 1, "partial": 0 })
    );
    assert_eq!(body["logs"][0]["status"], json!("success"));
    assert_eq!(body["logs"][1]["error_message"], json!("disk full"));
    assert_eq!(
        body["latestSuccessful"]["vm_failover"],
        body["logs"][0]["created_at"]
    );
    assert!(body["latestSuccessful"]["backup"].is_null());
}

#[tokio::test]
async fn logs_limit_and_status_filter() {
    let app = TestApp::new().await;
    for minutes in 1..=4 {
        seed_log(&app, "backup", "success", minutes).await;
    }
    seed_log(&app, "backup", "partial", 5).await;

    let limited = app.get("/api/ingestion/logs?limit=2").await.json();
    assert_eq!(limited["logs"].as_array().unwrap().len(), 2);
    assert_eq!(limited["stats"]["total"], json!(2));

    let partial = app.get("/api/ingestion/logs?status=partial").await.json();
    assert_eq!(partial["stats"]["partial"], json!(1));
    assert_eq!(partial["stats"]["total"], json!(1));
}

#[tokio::test]
async fn logs_reject_bad_parameters() {
    let app = TestApp::new().await;

    for uri in [
        "/api/ingestion/logs?source_type=tape",
        "/api/ingestion/logs?status=unknown",
        "/api/ingestion/logs?limit=ten",
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(response.json()["error"]["code"], json!("INVALID_INPUT"));
    }
}

#[tokio::test]
async fn settings_defaults_and_update_round_trip() {
    let app = TestApp::new().await;

    let defaults = app.get("/api/settings").await;
    assert_eq!(defaults.status, StatusCode::OK);
    assert_eq!(
        defaults.json(),
        json!({
            "data_retention_days": { "days": 90 },
            "refresh_interval": { "seconds": 60 }
        })
    );

    let update = app
        .send_authorized(
            "PUT",
            "/api/settings",
            r#"{"refresh_interval":{"seconds":45},"theme":"dark"}"#,
        )
        .await;
    assert_eq!(update.status, StatusCode::OK);
    assert_eq!(
        update.json(),
        json!({ "success": true, "message": "Settings updated" })
    );

    let settings = app.get("/api/settings").await.json();
    assert_eq!(settings["refresh_interval"], json!({ "seconds": 45 }));
    assert_eq!(settings["theme"], json!("dark"));
    assert_eq!(settings["data_retention_days"], json!({ "days": 90 }));

    let summary = app.get("/api/monitor/summary").await.json();
    assert_eq!(summary["refreshIntervalSeconds"], json!(45));
}

#[tokio::test]
async fn settings_update_requires_service_key() {
    let app = TestApp::new().await;

    let response = app
        .send(json_request(
            "PUT",
            "/api/settings",
            r#"{"refresh_interval":{"seconds":5}}"#,
            None,
        ))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let settings = app.get("/api/settings").await.json();
    assert_eq!(settings["refresh_interval"], json!({ "seconds": 60 }));
}

#[tokio::test]
async fn settings_update_rejects_non_object_and_accepts_empty() {
    let app = TestApp::new().await;

    let rejected = app.send_authorized("PUT", "/api/settings", "[1,2]").await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);

    let empty = app.send_authorized("PUT", "/api/settings", "{}").await;
    assert_eq!(empty.status, StatusCode::OK);
}

#[tokio::test]
async fn summary_classifies_latest_batches() {
    let app = TestApp::new().await;

    app.send_authorized(
        "POST",
        "/api/ingest/backup",
        r#"{"data":[
            {"computerName":"SRV-01","backupStatus":"Success"},
            {"computerName":"SRV-02","backupStatus":"Stale (3 days)"},
            {"computerName":"SRV-03","backupStatus":"Backup failed"}
        ]}"#,
    )
    .await;
    app.send_authorized(
        "POST",
        "/api/ingest/vm",
        r#"{"data":[
            {"computerName":"HV-01","failoverStatus":"Active","vmName":"APP"},
            {"computerName":"HV-02","failoverStatus":"VM not found"}
        ]}"#,
    )
    .await;

    let response = app.get("/api/monitor/summary").await;
    assert_eq!(response.status, StatusCode::OK);
    let summary = response.json();
    assert_eq!(summary["backupTotal"], json!(3));
    assert_eq!(summary["backupIssues"], json!(2));
    assert_eq!(summary["vmTotal"], json!(2));
    assert_eq!(summary["activeVms"], json!(1));
    assert_eq!(summary["backupStale"], json!(false));
    assert_eq!(summary["vmStale"], json!(false));
    assert_eq!(summary["ingestionHealthy"], json!(true));
    assert_eq!(summary["refreshIntervalSeconds"], json!(60));
    assert_eq!(summary["backup"][1]["health"], json!("stale"));
    assert_eq!(summary["backup"][2]["health"], json!("failed"));
    assert_eq!(summary["vm"][1]["health"], json!("not_found"));
}

#[tokio::test]
async fn summary_without_data_is_stale() {
    let app = TestApp::new().await;

    let summary = app.get("/api/monitor/summary").await.json();

    assert_eq!(summary["backupTotal"], json!(0));
    assert_eq!(summary["backupStale"], json!(true));
    assert_eq!(summary["vmStale"], json!(true));
    assert_eq!(summary["ingestionHealthy"], json!(false));
}

#[tokio::test]
async fn health_ping_and_root() {
    let app = TestApp::new().await;

    let health = app.get("/api/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.json()["status"], json!("ok"));
    assert_eq!(health.json()["database"], json!("ok"));

    let ping = app.get("/ping").await;
    assert_eq!(ping.status, StatusCode::OK);
    assert_eq!(&ping.body[..], b"pong");

    let root = app.get("/").await;
    assert_eq!(root.json()["message"], json!("SD Monitor API"));
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let app = TestApp::new().await;

    let generated = app.get("/api/monitor").await;
    assert!(
        generated
            .headers
            .get("x-request-id")
            .is_some_and(|v| !v.is_empty())
    );

    let request = axum::http::Request::builder()
        .uri("/api/monitor")
        .header("x-request-id", "trace-123")
        .body(axum::body::Body::empty())
        .unwrap();
    let echoed = app.send(request).await;
    assert_eq!(echoed.headers["x-request-id"], "trace-123");
}

#[tokio::test]
async fn large_settings_update_applies_every_key() {
    let app = TestApp::new().await;
    let keys = 700;
    let mut updates = serde_json::Map::new();
    for i in 0..keys {
        updates.insert(format!("widget_{i:03}"), json!({ "visible": i % 2 == 0 }));
    }
    updates.insert("refresh_interval".to_string(), json!({ "seconds": 120 }));
    let payload = serde_json::Value::Object(updates).to_string();

    let response = app.send_authorized("PUT", "/api/settings", &payload).await;
    assert_eq!(response.status, StatusCode::OK);

    let settings = app.get("/api/settings").await.json();
    let settings = settings.as_object().unwrap();
    // 700 个新键 + 两个默认键
    assert_eq!(settings.len(), keys + 2);
    assert_eq!(settings["widget_699"], json!({ "visible": false }));
    assert_eq!(settings["refresh_interval"], json!({ "seconds": 120 }));
}

#[tokio::test]
async fn health_reports_unreachable_store() {
    let db = Arc::new(sea_orm::Database::connect("sqlite::memory:").await.unwrap());
    let mut config = AppConfig::default();
    config.auth.service_role_key = common::SERVICE_KEY.to_string();
    let config = Arc::new(config);
    let context = AppContext::new(
        Arc::clone(&config),
        db,
        Arc::new(DatabaseConnection::Disconnected),
    );
    let router = build_router(AppState::new(Arc::new(context)), &config.server);

    let response = router
        .oneshot(
            axum::http::Request::builder()
                .uri("/api/health")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"]["code"], json!("DATABASE_ERROR"));
}

#[tokio::test]
async fn static_dashboard_falls_back_to_index() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>sd-monitor</html>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
    let static_dir = dir.path().to_string_lossy().into_owned();

    let app = TestApp::with_config(|config| config.server.static_dir = Some(static_dir)).await;

    let asset = app.get("/app.js").await;
    assert_eq!(asset.status, StatusCode::OK);
    assert_eq!(&asset.body[..], b"console.log(1)");

    let deep_link = app.get("/history/backup").await;
    assert_eq!(deep_link.status, StatusCode::OK);
    assert_eq!(&deep_link.body[..], b"<html>sd-monitor</html>");

    let api = app.get("/api/monitor").await;
    assert_eq!(api.status, StatusCode::OK);
    assert_eq!(api.json()["backup"], json!([]));
}
