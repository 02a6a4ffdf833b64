// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::models::job::DomainError;

/// 抓取运行实体
///
/// 表示一个作业的一次实际执行。作业首次启动创建第一次运行，
/// 每次恢复创建新的运行，只覆盖上次未完成的目标。运行持有
/// 本次执行的结果统计。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRun {
    /// 运行唯一标识符
    pub id: Uuid,
    /// 所属作业ID
    pub job_id: Uuid,
    /// 本次运行覆盖的目标总数
    pub total_targets: u32,
    /// 成功完成的目标数
    pub completed_targets: u32,
    /// 失败终止的目标数
    pub failed_targets: u32,
    /// 成功抓取的平均响应时间（毫秒）
    pub avg_response_time_ms: Option<u64>,
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 结束时间，运行关闭时写入
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScrapeRun {
    /// 创建一个新的运行
    pub fn new(job_id: Uuid, total_targets: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            total_targets,
            completed_targets: 0,
            failed_targets: 0,
            avg_response_time_ms: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// 关闭运行，写入终止统计
    pub fn close(
        mut self,
        completed_targets: u32,
        failed_targets: u32,
        avg_response_time_ms: Option<u64>,
    ) -> Self {
        self.completed_targets = completed_targets;
        self.failed_targets = failed_targets;
        self.avg_response_time_ms = avg_response_time_ms;
        self.finished_at = Some(Utc::now());
        self
    }
}

/// 单目标任务实体
///
/// 表示一次运行中针对单个目标的抓取工作单元，是重试和
/// 进度统计的最小粒度。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetTask {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 所属运行ID
    pub run_id: Uuid,
    /// 所属作业ID
    pub job_id: Uuid,
    /// 抓取的目标ID
    pub target_id: Uuid,
    /// 任务状态
    pub status: TargetTaskStatus,
    /// 已执行的抓取尝试次数
    pub attempt_count: u32,
    /// 最近一次失败的错误信息
    pub last_error: Option<String>,
    /// 任务创建（分配到运行）的时间
    pub assigned_at: DateTime<Utc>,
    /// 首次分发执行的时间
    pub started_at: Option<DateTime<Utc>>,
    /// 终止时间
    pub completed_at: Option<DateTime<Utc>>,
    /// 成功时关联的结果ID
    pub result_id: Option<Uuid>,
}

/// 单目标任务状态枚举
///
/// 状态转换遵循以下流程：
/// Pending → InProgress → Completed/Failed，
/// InProgress → Pending（等待重试）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetTaskStatus {
    /// 待分发，含等待重试的任务
    #[default]
    Pending,
    /// 执行中，已占用并发额度
    InProgress,
    /// 已完成，抓取成功
    Completed,
    /// 已失败，重试预算耗尽或永久性错误
    Failed,
}

impl TargetTaskStatus {
    /// 判断状态是否为终止态
    pub fn is_terminal(&self) -> bool {
        matches!(self, TargetTaskStatus::Completed | TargetTaskStatus::Failed)
    }
}

impl fmt::Display for TargetTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TargetTaskStatus::Pending => write!(f, "pending"),
            TargetTaskStatus::InProgress => write!(f, "in_progress"),
            TargetTaskStatus::Completed => write!(f, "completed"),
            TargetTaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TargetTaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TargetTaskStatus::Pending),
            "in_progress" => Ok(TargetTaskStatus::InProgress),
            "completed" => Ok(TargetTaskStatus::Completed),
            "failed" => Ok(TargetTaskStatus::Failed),
            _ => Err(()),
        }
    }
}

impl TargetTask {
    /// 创建一个新的单目标任务
    ///
    /// # 参数
    ///
    /// * `run_id` - 所属运行ID
    /// * `job_id` - 所属作业ID
    /// * `target_id` - 抓取的目标ID
    /// * `attempt_count` - 初始尝试计数，恢复时从上次运行结转
    pub fn new(run_id: Uuid, job_id: Uuid, target_id: Uuid, attempt_count: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            job_id,
            target_id,
            status: TargetTaskStatus::Pending,
            attempt_count,
            last_error: None,
            assigned_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result_id: None,
        }
    }

    /// 开始一次抓取尝试
    ///
    /// 将任务状态从Pending变更为InProgress并累加尝试计数
    pub fn begin_attempt(mut self) -> Result<Self, DomainError> {
        match self.status {
            TargetTaskStatus::Pending => {
                self.status = TargetTaskStatus::InProgress;
                self.attempt_count += 1;
                if self.started_at.is_none() {
                    self.started_at = Some(Utc::now());
                }
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: TargetTaskStatus::InProgress.to_string(),
            }),
        }
    }

    /// 完成任务
    ///
    /// 将任务状态从InProgress变更为Completed并关联结果
    pub fn complete(mut self, result_id: Uuid) -> Result<Self, DomainError> {
        match self.status {
            TargetTaskStatus::InProgress => {
                self.status = TargetTaskStatus::Completed;
                self.result_id = Some(result_id);
                self.completed_at = Some(Utc::now());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: TargetTaskStatus::Completed.to_string(),
            }),
        }
    }

    /// 标记任务失败
    ///
    /// 将任务状态从InProgress变更为Failed，记录错误信息
    pub fn fail(mut self, error: String) -> Result<Self, DomainError> {
        match self.status {
            TargetTaskStatus::InProgress => {
                self.status = TargetTaskStatus::Failed;
                self.last_error = Some(error);
                self.completed_at = Some(Utc::now());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: TargetTaskStatus::Failed.to_string(),
            }),
        }
    }

    /// 退回等待重试
    ///
    /// 将任务状态从InProgress退回Pending，记录本次失败的
    /// 错误信息，尝试计数保留
    pub fn requeue(mut self, error: String) -> Result<Self, DomainError> {
        match self.status {
            TargetTaskStatus::InProgress => {
                self.status = TargetTaskStatus::Pending;
                self.last_error = Some(error);
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: TargetTaskStatus::Pending.to_string(),
            }),
        }
    }

    /// 中止本次尝试
    ///
    /// 暂停取消了进行中的抓取时使用。任务退回Pending且本次
    /// 尝试不计入，恢复后以相同的预算重新执行
    pub fn abort_attempt(mut self) -> Result<Self, DomainError> {
        match self.status {
            TargetTaskStatus::InProgress => {
                self.status = TargetTaskStatus::Pending;
                self.attempt_count = self.attempt_count.saturating_sub(1);
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: TargetTaskStatus::Pending.to_string(),
            }),
        }
    }
}
