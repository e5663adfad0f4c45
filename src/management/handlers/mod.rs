//! # 管理API处理器

pub mod ingest;
pub mod logs;
pub mod monitor;
pub mod settings;
pub mod system;
