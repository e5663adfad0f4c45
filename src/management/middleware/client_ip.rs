//! # 来源地址提取

use axum::http::HeaderMap;

/// 无法识别来源时记录的值
pub const UNKNOWN_SOURCE: &str = "unknown";

/// 取 `X-Forwarded-For` 的第一个地址
///
/// 不校验是否为合法 IP，原样记录代理给出的值。
#[must_use]
pub fn forwarded_source(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map_or_else(|| UNKNOWN_SOURCE.to_string(), ToString::to_string)
}
