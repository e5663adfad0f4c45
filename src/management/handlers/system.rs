//! # 系统信息处理器

use crate::logging::{LogComponent, LogStage, log_management_error};
use crate::management::middleware::RequestId;
use crate::management::response;
use crate::management::server::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Instant;

/// 全局启动时间
static START_TIME: OnceLock<Instant> = OnceLock::new();

/// 初始化启动时间
pub fn init_start_time() {
    START_TIME.set(Instant::now()).ok();
}

/// 获取程序运行时间（秒）
fn get_uptime_seconds() -> u64 {
    START_TIME.get_or_init(Instant::now).elapsed().as_secs()
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    database: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

/// 健康检查：探测数据库连通性
pub async fn health_check(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> axum::response::Response {
    match crate::database::ping(&state.reader).await {
        Ok(()) => response::success(HealthStatus {
            status: "ok",
            database: "ok",
            version: env!("CARGO_PKG_VERSION"),
            uptime_seconds: get_uptime_seconds(),
        }),
        Err(err) => {
            log_management_error(
                &request_id,
                LogStage::Database,
                LogComponent::Health,
                "health_check_fail",
                "健康检查失败",
                &err,
            );
            response::error(
                StatusCode::SERVICE_UNAVAILABLE,
                "DATABASE_ERROR",
                "Database is unreachable",
            )
        }
    }
}

/// 根路径处理器
pub async fn root_handler() -> axum::response::Response {
    response::success(serde_json::json!({
        "success": true,
        "message": "SD Monitor API",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Ping 处理器
pub async fn ping_handler() -> &'static str {
    "pong"
}
