// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post},
    Extension, Router,
};
use tower_http::trace::TraceLayer;

use crate::orchestrator::events::{BroadcastSubscriber, RingBufferSubscriber};
use crate::orchestrator::manager::EngineManager;
use crate::presentation::handlers::{
    dashboard_handler, engine_handler, job_handler, run_handler, target_handler,
};

/// 创建应用路由
///
/// # 参数
///
/// * `manager` - 引擎管理器
/// * `ring_buffer` - 仪表盘用的最近事件缓冲
/// * `broadcast` - SSE用的事件广播
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(
    manager: Arc<EngineManager>,
    ring_buffer: Arc<RingBufferSubscriber>,
    broadcast: Arc<BroadcastSubscriber>,
) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let engine_routes = Router::new()
        .route("/v1/engine/start", post(engine_handler::start_engine))
        .route("/v1/engine/pause", post(engine_handler::pause_engine))
        .route("/v1/engine/resume", post(engine_handler::resume_engine))
        .route("/v1/engine/reset", post(engine_handler::reset_engine))
        .route("/v1/engine/state", get(engine_handler::get_engine_state))
        .route(
            "/v1/engine/heartbeat",
            post(engine_handler::trigger_heartbeat),
        );

    let query_routes = Router::new()
        .route("/v1/jobs", get(job_handler::list_jobs))
        .route("/v1/jobs/{id}", get(job_handler::get_job))
        .route("/v1/runs", get(run_handler::list_runs))
        .route("/v1/runs/{id}", get(run_handler::get_run))
        .route("/v1/dashboard", get(dashboard_handler::get_dashboard))
        .route("/v1/logs/live", get(dashboard_handler::live_logs));

    let target_routes = Router::new()
        .route(
            "/v1/targets",
            post(target_handler::create_target).get(target_handler::list_targets),
        )
        .route("/v1/targets/{id}", get(target_handler::get_target))
        .route("/v1/targets/{id}", patch(target_handler::update_target))
        .route("/v1/targets/{id}", delete(target_handler::delete_target));

    Router::new()
        .merge(public_routes)
        .merge(engine_routes)
        .merge(query_routes)
        .merge(target_routes)
        .layer(Extension(manager))
        .layer(Extension(ring_buffer))
        .layer(Extension(broadcast))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
