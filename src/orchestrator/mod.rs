// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::models::job::DomainError;
use crate::domain::repositories::job_repository::RepositoryError;

/// 编排层模块
///
/// 该模块实现抓取作业的编排核心，包括：
/// - 认领表（claims）：目标的作业间独占
/// - 分发闸门（dispatch）：全局并发上限与目标节流
/// - 事件总线（events）：生命周期事件的同步扇出
/// - 状态管理器（manager）：作业与引擎级操作入口
/// - 监控循环（monitor）：心跳与协作方健康探测
/// - 进度跟踪（progress）：运行内计数、百分比与预计剩余时间
/// - 运行执行器（run_executor）：单次运行的分发与重试控制循环
pub mod claims;
pub mod dispatch;
pub mod events;
pub mod manager;
pub mod monitor;
pub mod progress;
pub mod run_executor;

/// 编排错误类型
///
/// 状态管理器各操作返回的错误，控制面将其映射为HTTP响应。
#[derive(Error, Debug)]
pub enum EngineError {
    /// 目标已被其他作业认领
    #[error("Target {target_id} is already claimed by another job")]
    Conflict {
        /// 按请求顺序第一个冲突的目标ID
        target_id: Uuid,
    },

    /// 资源不存在
    #[error("{resource} not found")]
    NotFound {
        /// 资源描述
        resource: String,
    },

    /// 当前状态不允许该操作
    #[error("Invalid state: {reason}")]
    InvalidState {
        /// 拒绝原因
        reason: String,
    },

    /// 依赖的服务不可用
    #[error("{what} is unavailable")]
    Unavailable {
        /// 不可用的服务
        what: String,
    },

    /// 请求参数无效
    #[error("Validation error: {message}")]
    Validation {
        /// 校验失败说明
        message: String,
    },

    /// 仓库层错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<DomainError> for EngineError {
    fn from(e: DomainError) -> Self {
        EngineError::InvalidState {
            reason: e.to_string(),
        }
    }
}

/// 作业执行句柄
///
/// 状态管理器为每个活跃的运行保存一份，暂停与重置通过
/// 取消令牌通知执行器。
pub struct JobHandle {
    /// 当前运行的ID
    pub run_id: Uuid,
    /// 该运行的取消令牌
    pub cancel: CancellationToken,
    /// 执行器任务句柄
    pub join: JoinHandle<()>,
}
