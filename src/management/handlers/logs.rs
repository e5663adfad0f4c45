//! # 接入日志处理器
//!
//! 处理 HTTP 请求，委托具体查询给 `LogsService`。

use crate::{
    error::MonitorError,
    logging::{LogComponent, LogStage, log_management_error},
    management::{
        middleware::RequestId,
        response,
        server::AppState,
        services::{LogsFilter, LogsListQuery, LogsService},
    },
};
use axum::{
    extract::{Extension, Query, State, rejection::QueryRejection},
    response::Response,
};

/// 获取接入日志列表
pub async fn get_ingestion_logs(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    query: Result<Query<LogsListQuery>, QueryRejection>,
) -> Response {
    let filter = query
        .map_err(|rejection| MonitorError::validation(rejection.body_text()))
        .and_then(|Query(query)| LogsFilter::try_from(&query));

    let filter = match filter {
        Ok(filter) => filter,
        Err(err) => {
            log_management_error(
                &request_id,
                LogStage::Validation,
                LogComponent::IngestionLogs,
                "parse_logs_query_fail",
                "接入日志查询参数不合法",
                &err,
            );
            return response::app_error(err);
        }
    };

    let service = LogsService::new(&state);
    match service.list(&filter).await {
        Ok(result) => response::success(result),
        Err(err) => {
            log_management_error(
                &request_id,
                LogStage::Query,
                LogComponent::IngestionLogs,
                "get_ingestion_logs_fail",
                "获取接入日志失败",
                &err,
            );
            response::app_error(err)
        }
    }
}
