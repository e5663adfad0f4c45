//! # 路由配置
//!
//! 定义所有API路由和路由组织

use crate::management::handlers::{ingest, logs, monitor, settings, system};
use crate::management::middleware::require_service_role;
use crate::management::server::AppState;
use axum::routing::{get, post, put};
use axum::{Router, middleware};

/// 创建所有路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 数据接入路由（共享密钥）
        .nest("/ingest", ingest_routes(state.clone()))
        // 监控数据路由
        .nest("/monitor", monitor_routes())
        // 接入日志路由
        .nest("/ingestion", ingestion_log_routes())
        // 设置路由
        .nest("/settings", settings_routes(state.clone()))
        // 健康检查路由
        .route("/health", get(system::health_check))
        .with_state(state)
}

/// 数据接入路由
fn ingest_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/backup", post(ingest::ingest_backup))
        .route("/vm", post(ingest::ingest_vm))
        .route_layer(middleware::from_fn_with_state(state, require_service_role))
}

/// 监控数据路由
fn monitor_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(monitor::get_monitor))
        .route("/summary", get(monitor::get_summary))
}

/// 接入日志路由
fn ingestion_log_routes() -> Router<AppState> {
    Router::new().route("/logs", get(logs::get_ingestion_logs))
}

/// 设置路由，只有写入需要共享密钥
fn settings_routes(state: AppState) -> Router<AppState> {
    let write = put(settings::update_settings)
        .route_layer(middleware::from_fn_with_state(state, require_service_role));

    Router::new().route("/", get(settings::get_settings).merge(write))
}
