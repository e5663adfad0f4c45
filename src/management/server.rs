//! # 管理服务器
//!
//! Axum HTTP服务器，提供数据接入与仪表板查询API

use super::middleware::request_id_middleware;
use crate::app::context::AppContext;
use crate::config::ServerConfig;
use crate::error::{MonitorError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{linfo, lwarn};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use std::net::SocketAddr;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// 管理服务器应用状态
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
}

impl AppState {
    #[must_use]
    pub const fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// 管理服务器
pub struct ManagementServer {
    config: ServerConfig,
    router: Router,
}

impl ManagementServer {
    /// 创建新的管理服务器
    #[must_use]
    pub fn new(context: Arc<AppContext>) -> Self {
        let config = context.config.server.clone();
        let router = build_router(AppState::new(context), &config);
        Self { config, router }
    }

    /// 获取绑定地址
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let ip = self.config.host.parse::<std::net::IpAddr>().map_err(|e| {
            MonitorError::config_with_source(format!("Invalid bind address '{}'", self.config.host), e)
        })?;
        Ok(SocketAddr::new(ip, self.config.port))
    }

    /// 启动服务器，收到 Ctrl+C 后优雅退出
    pub async fn serve(self) -> Result<()> {
        let addr = self.bind_address()?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "server_start",
            &format!("Starting SD Monitor server on {addr}")
        );

        let listener = TcpListener::bind(&addr).await?;

        axum::serve(
            listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MonitorError::internal_with_source("Server error", e))?;

        Ok(())
    }
}

/// 创建路由器
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let api_routes = super::routes::create_routes(state);

    // axum 不允许在根路径 nest
    let prefix = config.api_prefix.trim_end_matches('/');
    let mut app = if prefix.is_empty() {
        Router::new().merge(api_routes)
    } else {
        Router::new().nest(prefix, api_routes)
    };
    app = app.route("/ping", get(crate::management::handlers::system::ping_handler));

    match static_service(config.static_dir.as_deref()) {
        Some(service) => app = app.fallback_service(service),
        None => {
            app = app.route("/", get(crate::management::handlers::system::root_handler));
        }
    }

    app = app.layer(DefaultBodyLimit::max(config.max_request_size));

    let service_builder = ServiceBuilder::new().layer(TraceLayer::new_for_http());
    if config.enable_cors {
        app = app.layer(service_builder.layer(cors_layer(&config.cors_origins)));
    } else {
        app = app.layer(service_builder);
    }

    app.layer(axum::middleware::from_fn(request_id_middleware))
}

/// 仪表板静态文件服务，未匹配的路径回落到 `index.html`；目录不存在时返回 `None`
fn static_service(static_dir: Option<&str>) -> Option<ServeDir<ServeFile>> {
    let dir = Path::new(static_dir?);
    if !dir.exists() {
        lwarn!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "static_dir_not_found",
            &format!("Static directory {} not found, static files will not be served", dir.display())
        );
        return None;
    }

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::ServerSetup,
        "static_service_enabled",
        &format!("Enabling static file service from {}", dir.display())
    );
    Some(ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
            axum::http::header::ORIGIN,
        ]);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let parsed = origins
        .iter()
        .map(|origin| origin.parse::<axum::http::HeaderValue>())
        .collect::<std::result::Result<Vec<_>, _>>();

    match parsed {
        Ok(origins) => layer.allow_origin(origins),
        Err(e) => {
            lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::ServerSetup,
                "cors_config_fail",
                &format!("Invalid CORS origin configuration: {e}, falling back to allow any")
            );
            layer.allow_origin(Any)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        lwarn!(
            "system",
            LogStage::Shutdown,
            LogComponent::Main,
            "signal_listen_fail",
            &format!("Failed to listen for shutdown signal: {e}")
        );
        std::future::pending::<()>().await;
    }
}
