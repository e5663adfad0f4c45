//! # Entity 模块
//!
//! 包含所有 Sea-ORM 实体定义

pub mod app_settings;
pub mod backup_reports;
pub mod ingestion_logs;
pub mod vm_failover_reports;

pub use app_settings::Entity as AppSettings;
pub use backup_reports::Entity as BackupReports;
pub use ingestion_logs::Entity as IngestionLogs;
pub use vm_failover_reports::Entity as VmFailoverReports;
