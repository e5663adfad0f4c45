//! # 管理API模块
//!
//! 提供数据接入、监控查询与设置管理的 HTTP 接口

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod services;

pub use routes::create_routes;
pub use server::{AppState, ManagementServer, build_router};
