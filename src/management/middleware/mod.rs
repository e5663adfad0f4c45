//! # 管理服务器中间件
//!
//! 提供各种中间件功能

pub mod auth;
pub mod client_ip;
pub mod request_id;

pub use auth::require_service_role;
pub use client_ip::forwarded_source;
pub use request_id::{RequestId, request_id_middleware};
