// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    application::dto::engine_control::{
        PauseRequestDto, PauseResponseDto, ResetRequestDto, ResetResponseDto, ResumeRequestDto,
        ResumeResponseDto, StartRequestDto, StartResponseDto,
    },
    domain::models::engine_state::EngineState,
    orchestrator::manager::{EngineManager, JobSelector},
    presentation::errors::ApiError,
};

/// 启动一个抓取作业
///
/// 校验目标列表，认领目标并派生运行执行器。成功返回201与
/// 新作业标识，目标被占用时返回409且不落任何作业记录。
pub async fn start_engine(
    Extension(manager): Extension<Arc<EngineManager>>,
    Json(request): Json<StartRequestDto>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;

    let job = manager
        .start_job(
            request.target_ids,
            request.priority.unwrap_or(0),
            request.mode.unwrap_or_default(),
        )
        .await?;

    let response = StartResponseDto {
        job_id: job.id,
        status: job.status,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// 暂停作业
///
/// 请求体缺省`job_ids`或为空列表时暂停全部运行中的作业，
/// 返回实际完成暂停的数量。
pub async fn pause_engine(
    Extension(manager): Extension<Arc<EngineManager>>,
    Json(request): Json<PauseRequestDto>,
) -> Result<Json<PauseResponseDto>, ApiError> {
    let selector = match request.job_ids {
        Some(ids) if !ids.is_empty() => JobSelector::Ids(ids),
        _ => JobSelector::AllRunning,
    };
    let paused_count = manager.pause_jobs(selector).await?;
    Ok(Json(PauseResponseDto { paused_count }))
}

/// 恢复一个已暂停的作业
pub async fn resume_engine(
    Extension(manager): Extension<Arc<EngineManager>>,
    Json(request): Json<ResumeRequestDto>,
) -> Result<Json<ResumeResponseDto>, ApiError> {
    let job = manager.resume_job(request.job_id).await?;
    Ok(Json(ResumeResponseDto {
        job_id: job.id,
        status: job.status,
    }))
}

/// 硬重置引擎
///
/// 取消全部活跃作业并释放认领，按请求可选清空抓取历史与
/// 目标注册表。未确认时返回400。
pub async fn reset_engine(
    Extension(manager): Extension<Arc<EngineManager>>,
    Json(request): Json<ResetRequestDto>,
) -> Result<Json<ResetResponseDto>, ApiError> {
    manager
        .hard_reset(
            request.confirm,
            request.wipe_data.unwrap_or(false),
            request.wipe_config.unwrap_or(false),
        )
        .await?;
    Ok(Json(ResetResponseDto {
        status: "reset".to_string(),
    }))
}

/// 读取引擎状态快照
pub async fn get_engine_state(
    Extension(manager): Extension<Arc<EngineManager>>,
) -> Json<EngineState> {
    Json(manager.engine_state())
}

/// 立即重算并返回引擎状态
pub async fn trigger_heartbeat(
    Extension(manager): Extension<Arc<EngineManager>>,
) -> Result<Json<EngineState>, ApiError> {
    let state = manager.heartbeat().await?;
    Ok(Json(state))
}
