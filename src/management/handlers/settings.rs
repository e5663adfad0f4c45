//! # 应用设置处理器

use crate::{
    linfo,
    logging::{LogComponent, LogStage, log_management_error},
    management::{
        middleware::RequestId,
        response,
        server::AppState,
        services::{SettingsService, settings},
    },
};
use axum::{
    body::Bytes,
    extract::{Extension, State},
    response::Response,
};

/// 读取全部设置
pub async fn get_settings(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Response {
    match SettingsService::reader(&state).get_all().await {
        Ok(settings) => response::success(settings),
        Err(err) => {
            log_management_error(
                &request_id,
                LogStage::Query,
                LogComponent::Settings,
                "get_settings_fail",
                "获取设置失败",
                &err,
            );
            response::app_error(err)
        }
    }
}

/// 更新设置，需共享密钥
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> Response {
    let updates = match settings::parse_update(&body) {
        Ok(updates) => updates,
        Err(err) => {
            log_management_error(
                &request_id,
                LogStage::Validation,
                LogComponent::Settings,
                "parse_settings_fail",
                "设置请求体不合法",
                &err,
            );
            return response::app_error(err);
        }
    };

    match SettingsService::writer(&state).update(updates).await {
        Ok(count) => {
            linfo!(
                request_id,
                LogStage::Database,
                LogComponent::Settings,
                "settings_updated",
                &format!("已更新 {count} 项设置")
            );
            response::acknowledged(settings::SETTINGS_UPDATED_MESSAGE)
        }
        Err(err) => {
            log_management_error(
                &request_id,
                LogStage::Database,
                LogComponent::Settings,
                "update_settings_fail",
                "更新设置失败",
                &err,
            );
            response::app_error(err)
        }
    }
}
