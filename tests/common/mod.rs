//! 集成测试公共工具：内存数据库 + 完整路由

#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use sd_monitor::AppConfig;
use sd_monitor::app::AppContext;
use sd_monitor::database;
use sd_monitor::management::{AppState, build_router};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const SERVICE_KEY: &str = "test-service-role-key";

pub struct TestApp {
    pub router: Router,
    pub db: Arc<DatabaseConnection>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// 在默认测试配置上做额外调整
    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("connect test db");
        database::ensure_schema(&db).await.expect("create schema");
        database::ensure_default_settings(&db)
            .await
            .expect("seed default settings");
        let db = Arc::new(db);

        let mut config = AppConfig::default();
        config.auth.service_role_key = SERVICE_KEY.to_string();
        customize(&mut config);
        let config = Arc::new(config);

        let context = AppContext::with_shared_connection(Arc::clone(&config), Arc::clone(&db));
        let router = build_router(AppState::new(Arc::new(context)), &config.server);

        Self { router, db }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("build request"),
        )
        .await
    }

    /// 携带正确共享密钥发送 JSON
    pub async fn send_authorized(&self, method: &str, uri: &str, body: &str) -> TestResponse {
        self.send(json_request(method, uri, body, Some(&format!("Bearer {SERVICE_KEY}"))))
            .await
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    body: &str,
    authorization: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("build request")
}
