// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::target::TargetSnapshot;

/// 抓取作业实体
///
/// 表示针对一组目标站点的一次受监督的批量抓取，是引擎的
/// 顶层生命周期单元。作业持有目标的独占认领和启动时的
/// 配置快照；实际抓取在其下属的运行（run）中执行。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    /// 作业唯一标识符
    pub id: Uuid,
    /// 本次作业覆盖的目标ID列表，按请求顺序
    pub target_ids: Vec<Uuid>,
    /// 作业优先级，数值越大优先级越高
    pub priority: i32,
    /// 触发方式，手动或调度
    pub mode: JobMode,
    /// 作业状态，跟踪作业在其生命周期中的当前阶段
    pub status: JobStatus,
    /// 启动时的目标配置快照，保证运行期间参数稳定
    pub snapshots: Vec<TargetSnapshot>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 开始执行时间
    pub started_at: Option<DateTime<Utc>>,
    /// 暂停时间
    pub paused_at: Option<DateTime<Utc>>,
    /// 终止时间（完成、失败或取消）
    pub completed_at: Option<DateTime<Utc>>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 作业触发方式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// 手动触发
    #[default]
    Manual,
    /// 调度触发
    Scheduled,
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobMode::Manual => write!(f, "manual"),
            JobMode::Scheduled => write!(f, "scheduled"),
        }
    }
}

impl FromStr for JobMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(JobMode::Manual),
            "scheduled" => Ok(JobMode::Scheduled),
            _ => Err(()),
        }
    }
}

/// 作业状态枚举
///
/// 表示作业在其生命周期中的不同状态。状态转换遵循以下流程：
/// Pending → Running → Completed/Failed/Paused/Cancelled，
/// Paused → Running（恢复）或 Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// 待启动，作业已创建但执行器尚未接管
    #[default]
    Pending,
    /// 运行中，任务正在分发和执行
    Running,
    /// 已暂停，可恢复，未完成的目标保留
    Paused,
    /// 已完成，至少一个目标抓取成功
    Completed,
    /// 已失败，所有目标均以失败终止
    Failed,
    /// 已取消，由操作员或硬重置终止
    Cancelled,
}

impl JobStatus {
    /// 判断状态是否为终止态
    ///
    /// 终止态的作业不再持有目标认领，也不能恢复
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Paused => write!(f, "paused"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "paused" => Ok(JobStatus::Paused),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// 领域错误类型
///
/// 表示在领域层可能发生的各种错误情况，包括状态转换错误
/// 和验证失败。
#[derive(Error, Debug)]
pub enum DomainError {
    /// 无效的状态转换，当状态变更不符合生命周期规则时发生
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// 当前状态
        from: String,
        /// 目标状态
        to: String,
    },

    /// 验证错误，当输入数据不符合领域规则时发生
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ScrapeJob {
    /// 创建一个新的抓取作业
    ///
    /// # 参数
    ///
    /// * `target_ids` - 目标ID列表，按请求顺序
    /// * `priority` - 作业优先级
    /// * `mode` - 触发方式
    /// * `snapshots` - 启动时的目标配置快照
    ///
    /// # 返回值
    ///
    /// 返回处于Pending状态的新作业实例
    pub fn new(
        target_ids: Vec<Uuid>,
        priority: i32,
        mode: JobMode,
        snapshots: Vec<TargetSnapshot>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            target_ids,
            priority,
            mode,
            status: JobStatus::Pending,
            snapshots,
            created_at: now,
            started_at: None,
            paused_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    /// 启动作业
    ///
    /// 将作业状态从Pending变更为Running
    pub fn start(mut self) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Pending => {
                self.status = JobStatus::Running;
                self.started_at = Some(Utc::now());
                self.updated_at = Utc::now();
                Ok(self)
            }
            _ => Err(self.transition_error(JobStatus::Running)),
        }
    }

    /// 暂停作业
    ///
    /// 将作业状态从Running变更为Paused
    pub fn pause(mut self) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Running => {
                self.status = JobStatus::Paused;
                self.paused_at = Some(Utc::now());
                self.updated_at = Utc::now();
                Ok(self)
            }
            _ => Err(self.transition_error(JobStatus::Paused)),
        }
    }

    /// 恢复作业
    ///
    /// 将作业状态从Paused变更为Running
    pub fn resume(mut self) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Paused => {
                self.status = JobStatus::Running;
                self.paused_at = None;
                self.updated_at = Utc::now();
                Ok(self)
            }
            _ => Err(self.transition_error(JobStatus::Running)),
        }
    }

    /// 完成作业
    ///
    /// 将作业状态从Running变更为Completed
    pub fn complete(mut self) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Running => {
                self.status = JobStatus::Completed;
                self.completed_at = Some(Utc::now());
                self.updated_at = Utc::now();
                Ok(self)
            }
            _ => Err(self.transition_error(JobStatus::Completed)),
        }
    }

    /// 标记作业失败
    ///
    /// 将作业状态从Running变更为Failed
    pub fn fail(mut self) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Running => {
                self.status = JobStatus::Failed;
                self.completed_at = Some(Utc::now());
                self.updated_at = Utc::now();
                Ok(self)
            }
            _ => Err(self.transition_error(JobStatus::Failed)),
        }
    }

    /// 取消作业
    ///
    /// 非终止态的作业均可取消
    pub fn cancel(mut self) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Pending | JobStatus::Running | JobStatus::Paused => {
                self.status = JobStatus::Cancelled;
                self.completed_at = Some(Utc::now());
                self.updated_at = Utc::now();
                Ok(self)
            }
            _ => Err(self.transition_error(JobStatus::Cancelled)),
        }
    }

    fn transition_error(&self, to: JobStatus) -> DomainError {
        DomainError::InvalidStateTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}
