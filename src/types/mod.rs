//! # 领域类型
//!
//! 接入来源与接入状态在库中以字符串保存，这里提供强类型表示

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MonitorError;

/// 接入来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionSource {
    Backup,
    VmFailover,
}

impl IngestionSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::VmFailover => "vm_failover",
        }
    }
}

impl fmt::Display for IngestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestionSource {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backup" => Ok(Self::Backup),
            "vm_failover" => Ok(Self::VmFailover),
            other => Err(MonitorError::validation_field(
                format!("Unknown source_type: {other}"),
                "source_type",
            )),
        }
    }
}

/// 接入结果状态
///
/// `partial` 只作为可查询的取值存在，接入流程本身只写入 `success` 与 `error`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    Success,
    Error,
    Partial,
}

impl IngestionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Partial => "partial",
        }
    }
}

impl fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestionStatus {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "partial" => Ok(Self::Partial),
            other => Err(MonitorError::validation_field(
                format!("Unknown status: {other}"),
                "status",
            )),
        }
    }
}
