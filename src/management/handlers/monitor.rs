//! # 监控数据处理器

use crate::{
    logging::{LogComponent, LogStage, log_management_error},
    management::{
        middleware::RequestId,
        response,
        server::AppState,
        services::{MonitorService, SummaryService},
    },
};
use axum::{
    extract::{Extension, State},
    response::Response,
};

/// 最近一次成功接入的备份与虚拟机数据
pub async fn get_monitor(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Response {
    let service = MonitorService::new(&state);
    match service.snapshot().await {
        Ok(snapshot) => response::success(snapshot),
        Err(err) => {
            log_management_error(
                &request_id,
                LogStage::Query,
                LogComponent::Monitor,
                "get_monitor_fail",
                "获取监控数据失败",
                &err,
            );
            response::app_error(err)
        }
    }
}

/// 仪表板摘要
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Response {
    match SummaryService::new(&state).summary().await {
        Ok(summary) => response::success(summary),
        Err(err) => {
            log_management_error(
                &request_id,
                LogStage::Query,
                LogComponent::Monitor,
                "get_summary_fail",
                "获取仪表板摘要失败",
                &err,
            );
            response::app_error(err)
        }
    }
}
