//! # 仪表板摘要服务
//!
//! 在监控快照之上计算健康分类、问题计数与数据陈旧标记。

use chrono::{DateTime, Duration, Utc};
use entity::{backup_reports, vm_failover_reports};
use serde::{Deserialize, Serialize};

use super::monitor::{MonitorService, MonitorSnapshot};
use super::settings::SettingsService;
use crate::error::Result;
use crate::management::server::AppState;

/// 超过该时长没有成功接入即视为陈旧
pub const STALENESS_WINDOW_MINUTES: i64 = 30;

/// 备份行健康分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupHealth {
    Success,
    Stale,
    Failed,
    Unknown,
}

impl BackupHealth {
    /// 按状态文本分类，大小写不敏感，按 success > stale > failed 的顺序匹配
    #[must_use]
    pub fn classify(status: &str) -> Self {
        let lower = status.to_lowercase();
        if lower.contains("success") {
            Self::Success
        } else if lower.contains("stale") {
            Self::Stale
        } else if lower.contains("failed") {
            Self::Failed
        } else {
            Self::Unknown
        }
    }
}

/// 备份状态是否计入问题数
#[must_use]
pub fn is_backup_issue(status: &str) -> bool {
    let lower = status.to_lowercase();
    lower.contains("stale") || lower.contains("failed")
}

/// 虚拟机行健康分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmHealth {
    Active,
    NotFound,
    Other,
}

impl VmHealth {
    #[must_use]
    pub fn classify(status: &str) -> Self {
        let lower = status.to_lowercase();
        if lower == "active" {
            Self::Active
        } else if lower.is_empty() || lower.contains("not found") {
            Self::NotFound
        } else {
            Self::Other
        }
    }
}

/// 某来源是否陈旧：从未成功接入，或最近一次成功早于窗口
#[must_use]
pub fn is_stale(latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    latest.is_none_or(|at| at < now - Duration::minutes(STALENESS_WINDOW_MINUTES))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRowHealth {
    pub computer_name: String,
    pub backup_status: String,
    pub health: BackupHealth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmRowHealth {
    pub computer_name: String,
    pub vm_name: Option<String>,
    pub failover_status: String,
    pub health: VmHealth,
}

/// 仪表板摘要响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub backup_total: usize,
    pub backup_issues: usize,
    pub vm_total: usize,
    pub active_vms: usize,
    pub backup_stale: bool,
    pub vm_stale: bool,
    pub ingestion_healthy: bool,
    pub refresh_interval_seconds: u64,
    pub latest_backup_ingestion: Option<DateTime<Utc>>,
    #[serde(rename = "latestVMIngestion")]
    pub latest_vm_ingestion: Option<DateTime<Utc>>,
    pub backup: Vec<BackupRowHealth>,
    pub vm: Vec<VmRowHealth>,
    pub generated_at: DateTime<Utc>,
}

impl DashboardSummary {
    /// 由快照计算摘要
    #[must_use]
    pub fn from_snapshot(snapshot: &MonitorSnapshot, refresh_interval_seconds: u64) -> Self {
        let now = snapshot.last_updated;
        let backup: Vec<BackupRowHealth> = snapshot.backup.iter().map(backup_row).collect();
        let vm: Vec<VmRowHealth> = snapshot.vm.iter().map(vm_row).collect();

        let backup_issues = snapshot
            .backup
            .iter()
            .filter(|row| is_backup_issue(&row.backup_status))
            .count();
        let active_vms = vm.iter().filter(|row| row.health == VmHealth::Active).count();
        let backup_stale = is_stale(snapshot.latest_backup_ingestion, now);
        let vm_stale = is_stale(snapshot.latest_vm_ingestion, now);

        Self {
            backup_total: backup.len(),
            backup_issues,
            vm_total: vm.len(),
            active_vms,
            backup_stale,
            vm_stale,
            ingestion_healthy: !backup_stale && !vm_stale,
            refresh_interval_seconds,
            latest_backup_ingestion: snapshot.latest_backup_ingestion,
            latest_vm_ingestion: snapshot.latest_vm_ingestion,
            backup,
            vm,
            generated_at: now,
        }
    }
}

fn backup_row(row: &backup_reports::Model) -> BackupRowHealth {
    BackupRowHealth {
        computer_name: row.computer_name.clone(),
        backup_status: row.backup_status.clone(),
        health: BackupHealth::classify(&row.backup_status),
    }
}

fn vm_row(row: &vm_failover_reports::Model) -> VmRowHealth {
    VmRowHealth {
        computer_name: row.computer_name.clone(),
        vm_name: row.vm_name.clone(),
        failover_status: row.failover_status.clone(),
        health: VmHealth::classify(&row.failover_status),
    }
}

pub struct SummaryService<'a> {
    state: &'a AppState,
}

impl<'a> SummaryService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn summary(&self) -> Result<DashboardSummary> {
        let snapshot = MonitorService::new(self.state).snapshot().await?;
        let refresh = SettingsService::reader(self.state)
            .refresh_interval_seconds()
            .await?;
        Ok(DashboardSummary::from_snapshot(&snapshot, refresh))
    }
}
