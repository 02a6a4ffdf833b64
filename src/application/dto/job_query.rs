// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::job::{JobStatus, ScrapeJob};
use crate::domain::models::run::{ScrapeRun, TargetTask};
use crate::domain::repositories::job_repository::JobQueryParams;

/// 作业查询请求DTO
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct JobQueryRequestDto {
    /// 状态过滤
    pub status: Option<JobStatus>,

    /// 只返回覆盖该目标的作业
    pub target_id: Option<Uuid>,

    /// 返回条数上限，默认100
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u32>,

    /// 分页偏移
    pub offset: Option<u32>,
}

impl JobQueryRequestDto {
    /// 转换为仓库查询参数
    pub fn into_params(self) -> JobQueryParams {
        JobQueryParams {
            statuses: self.status.map(|s| vec![s]),
            target_id: self.target_id,
            limit: self.limit.unwrap_or(100),
            offset: self.offset.unwrap_or(0),
        }
    }
}

/// 作业详情响应DTO
///
/// 作业本体加最近一次运行的汇总。
#[derive(Debug, Serialize)]
pub struct JobDetailDto {
    #[serde(flatten)]
    pub job: ScrapeJob,
    pub latest_run: Option<ScrapeRun>,
}

/// 运行详情响应DTO
///
/// 运行本体加按分配顺序排列的逐目标任务明细。
#[derive(Debug, Serialize)]
pub struct RunDetailDto {
    #[serde(flatten)]
    pub run: ScrapeRun,
    pub tasks: Vec<TargetTask>,
}

/// 运行列表查询DTO
#[derive(Debug, Deserialize, Serialize)]
pub struct RunQueryRequestDto {
    pub job_id: Uuid,
}
