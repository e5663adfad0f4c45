//! # SD Monitor Library
//!
//! 备份与虚拟机故障转移状态看板的后端核心库

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod management;
pub mod types;

pub use config::AppConfig;
pub use error::{MonitorError, Result};
