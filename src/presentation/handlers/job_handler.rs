// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    application::dto::job_query::{JobDetailDto, JobQueryRequestDto},
    domain::models::job::ScrapeJob,
    orchestrator::manager::EngineManager,
    presentation::errors::ApiError,
};

/// 查询作业列表
///
/// 支持按状态与目标过滤，按创建时间倒序分页返回。
pub async fn list_jobs(
    Extension(manager): Extension<Arc<EngineManager>>,
    Query(request): Query<JobQueryRequestDto>,
) -> Result<Json<Vec<ScrapeJob>>, ApiError> {
    request.validate()?;
    let jobs = manager.query_jobs(request.into_params()).await?;
    Ok(Json(jobs))
}

/// 查询单个作业及其最近一次运行
pub async fn get_job(
    Extension(manager): Extension<Arc<EngineManager>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobDetailDto>, ApiError> {
    let (job, latest_run) = manager.get_job(job_id).await?;
    Ok(Json(JobDetailDto { job, latest_run }))
}
