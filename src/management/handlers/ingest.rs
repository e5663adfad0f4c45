//! # 数据接入处理器
//!
//! 共享密钥已由路由中间件校验，这里负责解析请求体并委托 `IngestionService`。

use crate::{
    logging::{LogComponent, LogStage, log_management_error},
    management::{
        middleware::{RequestId, forwarded_source},
        response,
        server::AppState,
        services::{IngestionService, ReportBatch},
    },
    types::IngestionSource,
};
use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::HeaderMap,
    response::Response,
};

/// 接入备份状态
pub async fn ingest_backup(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    ingest(&state, &request_id, IngestionSource::Backup, &headers, &body).await
}

/// 接入虚拟机故障转移状态
pub async fn ingest_vm(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    ingest(&state, &request_id, IngestionSource::VmFailover, &headers, &body).await
}

async fn ingest(
    state: &AppState,
    request_id: &RequestId,
    source: IngestionSource,
    headers: &HeaderMap,
    body: &[u8],
) -> Response {
    let batch = match ReportBatch::parse(source, body) {
        Ok(batch) => batch,
        Err(err) => {
            log_management_error(
                request_id,
                LogStage::Validation,
                LogComponent::Ingest,
                "parse_batch_fail",
                &format!("接入请求体不合法 ({source})"),
                &err,
            );
            return response::app_error(err);
        }
    };

    let source_ip = forwarded_source(headers);
    let service = IngestionService::new(state);
    match service.ingest(request_id, &batch, &source_ip).await {
        Ok(result) => response::success(result),
        Err(err) => {
            log_management_error(
                request_id,
                LogStage::Ingestion,
                LogComponent::Ingest,
                "ingest_fail",
                &format!("数据接入失败 ({source})"),
                &err,
            );
            response::app_error(err)
        }
    }
}
