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

use crate::{
    application::dto::job_query::{RunDetailDto, RunQueryRequestDto},
    domain::models::run::ScrapeRun,
    orchestrator::manager::EngineManager,
    presentation::errors::ApiError,
};

/// 列出某作业的全部运行，按创建顺序
pub async fn list_runs(
    Extension(manager): Extension<Arc<EngineManager>>,
    Query(request): Query<RunQueryRequestDto>,
) -> Result<Json<Vec<ScrapeRun>>, ApiError> {
    let runs = manager.runs_for_job(request.job_id).await?;
    Ok(Json(runs))
}

/// 查询单次运行及其逐目标任务明细
pub async fn get_run(
    Extension(manager): Extension<Arc<EngineManager>>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RunDetailDto>, ApiError> {
    let (run, tasks) = manager.get_run(run_id).await?;
    Ok(Json(RunDetailDto { run, tasks }))
}
