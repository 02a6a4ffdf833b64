// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Serialize;

use crate::domain::models::engine_state::EngineState;
use crate::orchestrator::events::EventEnvelope;

/// 仪表盘响应DTO
///
/// 引擎状态快照加最近的生命周期事件，供运营页面单次拉取。
#[derive(Debug, Serialize)]
pub struct DashboardResponseDto {
    pub engine: EngineState,
    pub recent_events: Vec<EventEnvelope>,
}
