// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::job::{JobMode, JobStatus};

/// 作业启动请求DTO
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct StartRequestDto {
    /// 要抓取的目标ID列表，按期望的分发顺序
    #[validate(length(min = 1, max = 200))]
    pub target_ids: Vec<Uuid>,

    /// 作业优先级，默认0
    pub priority: Option<i32>,

    /// 触发方式，默认manual
    pub mode: Option<JobMode>,
}

/// 作业启动响应DTO
#[derive(Debug, Serialize)]
pub struct StartResponseDto {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// 暂停请求DTO
///
/// `job_ids`缺省或为空时暂停全部运行中的作业。
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PauseRequestDto {
    pub job_ids: Option<Vec<Uuid>>,
}

/// 暂停响应DTO
#[derive(Debug, Serialize)]
pub struct PauseResponseDto {
    pub paused_count: u32,
}

/// 恢复请求DTO
#[derive(Debug, Deserialize, Serialize)]
pub struct ResumeRequestDto {
    pub job_id: Uuid,
}

/// 恢复响应DTO
#[derive(Debug, Serialize)]
pub struct ResumeResponseDto {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// 硬重置请求DTO
#[derive(Debug, Deserialize, Serialize)]
pub struct ResetRequestDto {
    /// 必须为true，防止误触
    pub confirm: bool,

    /// 是否清空作业、运行与结果历史，默认false
    pub wipe_data: Option<bool>,

    /// 是否清空目标注册表，默认false
    pub wipe_config: Option<bool>,
}

/// 硬重置响应DTO
#[derive(Debug, Serialize)]
pub struct ResetResponseDto {
    pub status: String,
}
