// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::{
    application::dto::dashboard_response::DashboardResponseDto,
    orchestrator::events::{BroadcastSubscriber, RingBufferSubscriber},
    orchestrator::manager::EngineManager,
    presentation::errors::ApiError,
};

/// 仪表盘聚合视图
///
/// 重算引擎状态后连同最近事件一起返回，保证今日汇总与
/// 活跃作业数是当前值而不是上一次心跳的缓存。
pub async fn get_dashboard(
    Extension(manager): Extension<Arc<EngineManager>>,
    Extension(ring_buffer): Extension<Arc<RingBufferSubscriber>>,
) -> Result<Json<DashboardResponseDto>, ApiError> {
    let engine = manager.heartbeat().await?;
    let recent_events = ring_buffer.recent();
    Ok(Json(DashboardResponseDto {
        engine,
        recent_events,
    }))
}

/// 实时事件流
///
/// 把事件总线广播转成SSE，每条事件一帧JSON。消费过慢导致
/// 的滞后帧直接跳过，流本身不中断。
pub async fn live_logs(
    Extension(broadcast): Extension<Arc<BroadcastSubscriber>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(broadcast.receiver()).filter_map(|item| {
        let envelope = item.ok()?;
        let json = serde_json::to_string(&envelope).ok()?;
        Some(Ok(Event::default().data(json)))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
