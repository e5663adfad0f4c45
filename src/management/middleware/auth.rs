//! # 共享密钥认证中间件
//!
//! 写入类接口要求 `Authorization` 头与 `Bearer <service_role_key>` 完全一致，
//! 校验在读取请求体之前完成。

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use crate::error::MonitorError;
use crate::logging::{LogComponent, LogStage};
use crate::lwarn;
use crate::management::{middleware::RequestId, response, server::AppState};

/// 校验请求头中的共享密钥
#[must_use]
pub fn is_authorized(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected)
}

/// Axum认证中间件
pub async fn require_service_role(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_authorized(request.headers(), &state.config.auth.expected_header()) {
        return next.run(request).await;
    }

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    lwarn!(
        request_id,
        LogStage::Authentication,
        LogComponent::Auth,
        "service_role_rejected",
        &format!("共享密钥校验失败: {} {}", request.method(), request.uri().path())
    );

    response::app_error(MonitorError::unauthorized("Unauthorized"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_exact_match_only() {
        let mut headers = HeaderMap::new();
        assert!(!is_authorized(&headers, "Bearer k"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer k"));
        assert!(is_authorized(&headers, "Bearer k"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer k"));
        assert!(!is_authorized(&headers, "Bearer k"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer k "));
        assert!(!is_authorized(&headers, "Bearer k"));
    }
}
