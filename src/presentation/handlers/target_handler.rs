// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    application::dto::target_request::{
        CreateTargetRequestDto, TargetListQueryDto, UpdateTargetRequestDto,
    },
    domain::models::target::TargetConfig,
    orchestrator::manager::EngineManager,
    presentation::errors::ApiError,
};

/// 注册一个抓取目标
pub async fn create_target(
    Extension(manager): Extension<Arc<EngineManager>>,
    Json(request): Json<CreateTargetRequestDto>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;
    let target = manager.create_target(request.into_config()).await?;
    Ok((StatusCode::CREATED, Json(target)))
}

/// 列出目标，默认只含激活目标
pub async fn list_targets(
    Extension(manager): Extension<Arc<EngineManager>>,
    Query(query): Query<TargetListQueryDto>,
) -> Result<Json<Vec<TargetConfig>>, ApiError> {
    let targets = manager
        .list_targets(query.include_inactive.unwrap_or(false))
        .await?;
    Ok(Json(targets))
}

/// 读取一个目标
pub async fn get_target(
    Extension(manager): Extension<Arc<EngineManager>>,
    Path(target_id): Path<Uuid>,
) -> Result<Json<TargetConfig>, ApiError> {
    let target = manager.get_target(target_id).await?;
    Ok(Json(target))
}

/// 更新一个目标
///
/// 按补丁语义只修改请求给出的字段。已持有快照的运行不受
/// 影响，变更从下一次作业启动起生效。
pub async fn update_target(
    Extension(manager): Extension<Arc<EngineManager>>,
    Path(target_id): Path<Uuid>,
    Json(request): Json<UpdateTargetRequestDto>,
) -> Result<Json<TargetConfig>, ApiError> {
    request.validate()?;
    let current = manager.get_target(target_id).await?;
    let updated = manager.update_target(request.apply_to(current)).await?;
    Ok(Json(updated))
}

/// 删除一个目标
///
/// 目标被活跃作业认领时拒绝并返回409。
pub async fn delete_target(
    Extension(manager): Extension<Arc<EngineManager>>,
    Path(target_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    manager.delete_target(target_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
