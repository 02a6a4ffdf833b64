// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 抓取结果实体
///
/// 记录单目标任务一次终止尝试的结果，成功与失败都会留痕。
/// 结果只追加，不更新，构成作业执行的完整审计记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// 结果唯一标识符
    pub id: Uuid,
    /// 关联的单目标任务ID
    pub task_id: Uuid,
    /// 所属运行ID
    pub run_id: Uuid,
    /// 抓取的目标ID
    pub target_id: Uuid,
    /// 本次抓取是否成功
    pub success: bool,
    /// HTTP响应状态码，网络层失败时为空
    pub status_code: Option<u16>,
    /// 响应时间（毫秒），从发起请求到收到响应的总时间
    pub response_time_ms: u64,
    /// 提取到的职位条目数
    pub extracted_count: u32,
    /// 失败类型，成功时为空
    pub error_kind: Option<FailureKind>,
    /// 错误信息，成功时为空
    pub error_message: Option<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

/// 失败类型枚举
///
/// 对抓取失败的分类，决定重试策略的处理方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 瞬时失败（超时、连接错误、5xx），消耗重试预算
    Transient,
    /// 目标限流（429），不消耗重试预算，延迟翻倍
    RateLimited,
    /// 永久性失败（4xx、解析错误、配置无效），从不重试
    Permanent,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FailureKind::Transient => write!(f, "transient"),
            FailureKind::RateLimited => write!(f, "rate_limited"),
            FailureKind::Permanent => write!(f, "permanent"),
        }
    }
}

impl FromStr for FailureKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transient" => Ok(FailureKind::Transient),
            "rate_limited" => Ok(FailureKind::RateLimited),
            "permanent" => Ok(FailureKind::Permanent),
            _ => Err(()),
        }
    }
}

impl ScrapeResult {
    /// 记录一次成功的抓取
    ///
    /// # 参数
    ///
    /// * `task_id` - 关联的任务ID
    /// * `run_id` - 所属运行ID
    /// * `target_id` - 抓取的目标ID
    /// * `status_code` - HTTP响应状态码
    /// * `response_time_ms` - 响应时间（毫秒）
    /// * `extracted_count` - 提取到的条目数
    pub fn success(
        task_id: Uuid,
        run_id: Uuid,
        target_id: Uuid,
        status_code: u16,
        response_time_ms: u64,
        extracted_count: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            run_id,
            target_id,
            success: true,
            status_code: Some(status_code),
            response_time_ms,
            extracted_count,
            error_kind: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// 记录一次失败的抓取
    ///
    /// # 参数
    ///
    /// * `task_id` - 关联的任务ID
    /// * `run_id` - 所属运行ID
    /// * `target_id` - 抓取的目标ID
    /// * `kind` - 失败类型
    /// * `message` - 错误信息
    /// * `status_code` - HTTP状态码，未收到响应时为空
    /// * `response_time_ms` - 失败前耗时（毫秒）
    pub fn failure(
        task_id: Uuid,
        run_id: Uuid,
        target_id: Uuid,
        kind: FailureKind,
        message: String,
        status_code: Option<u16>,
        response_time_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            run_id,
            target_id,
            success: false,
            status_code,
            response_time_ms,
            extracted_count: 0,
            error_kind: Some(kind),
            error_message: Some(message),
            created_at: Utc::now(),
        }
    }
}
