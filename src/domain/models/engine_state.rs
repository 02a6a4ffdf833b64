// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 引擎状态枚举
///
/// 引擎级的聚合状态，由各作业的状态推导得出，Degraded
/// 由健康探测单独置位并优先于其他状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// 空闲，没有活跃作业
    #[default]
    Idle,
    /// 运行中，至少一个作业在执行
    Running,
    /// 已暂停，存在暂停作业且没有运行中的作业
    Paused,
    /// 降级，抓取协作方不可达，分发已挂起
    Degraded,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineStatus::Idle => write!(f, "idle"),
            EngineStatus::Running => write!(f, "running"),
            EngineStatus::Paused => write!(f, "paused"),
            EngineStatus::Degraded => write!(f, "degraded"),
        }
    }
}

impl FromStr for EngineStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(EngineStatus::Idle),
            "running" => Ok(EngineStatus::Running),
            "paused" => Ok(EngineStatus::Paused),
            "degraded" => Ok(EngineStatus::Degraded),
            _ => Err(()),
        }
    }
}

/// 从作业统计推导引擎状态
///
/// # 参数
///
/// * `running_jobs` - 运行中的作业数
/// * `paused_jobs` - 暂停中的作业数
/// * `degraded` - 健康探测是否已标记协作方不可达
///
/// # 返回值
///
/// 降级优先；否则有运行作业为Running，仅有暂停作业为Paused，
/// 都没有为Idle
pub fn derive_status(running_jobs: u32, paused_jobs: u32, degraded: bool) -> EngineStatus {
    if degraded {
        EngineStatus::Degraded
    } else if running_jobs > 0 {
        EngineStatus::Running
    } else if paused_jobs > 0 {
        EngineStatus::Paused
    } else {
        EngineStatus::Idle
    }
}

/// 运行时配置
///
/// 引擎的可调参数，硬重置时恢复默认值。并发上限在每次
/// 运行启动时捕获，修改只影响之后启动的运行。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// 全局同时执行的目标任务上限
    pub max_concurrent_targets: usize,
    /// 目标未指定时使用的默认最大重试次数
    pub default_max_retries: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_targets: 5,
            default_max_retries: 3,
        }
    }
}

/// 引擎状态快照
///
/// 心跳时重新计算的引擎全局视图，包括作业统计、今日抓取
/// 汇总和资源占用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    /// 引擎聚合状态
    pub status: EngineStatus,
    /// 活跃（运行中或暂停）的作业数
    pub active_jobs: u32,
    /// 今日成功完成的目标任务数
    pub targets_completed_today: u64,
    /// 今日失败终止的目标任务数
    pub targets_failed_today: u64,
    /// 今日成功率，没有样本时为1.0
    pub success_rate: f64,
    /// 最近一次心跳时间
    pub last_heartbeat: DateTime<Utc>,
    /// CPU使用率（0到1）
    pub cpu_usage: f64,
    /// 内存使用率（0到1）
    pub memory_usage: f64,
    /// 引擎版本号
    pub version: String,
    /// 当前运行时配置
    pub runtime_config: RuntimeConfig,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            status: EngineStatus::Idle,
            active_jobs: 0,
            targets_completed_today: 0,
            targets_failed_today: 0,
            success_rate: 1.0,
            last_heartbeat: Utc::now(),
            cpu_usage: 0.0,
            memory_usage: 0.0,
            version: env!("CARGO_PKG_VERSION").to_string(),
            runtime_config: RuntimeConfig::default(),
        }
    }
}
