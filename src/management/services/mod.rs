//! # 管理服务层
//!
//! 处理器只负责提取请求与渲染响应，查询与写入逻辑集中在这里。

pub mod ingest;
pub mod logs;
pub mod monitor;
pub mod settings;
pub mod summary;

pub use ingest::{BackupRecord, IngestResponse, IngestionService, ReportBatch, VmRecord};
pub use logs::{LogStats, LogsFilter, LogsListQuery, LogsListResponse, LogsService};
pub use monitor::{MonitorService, MonitorSnapshot};
pub use settings::SettingsService;
pub use summary::{DashboardSummary, SummaryService};
