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

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use harvestrs::config::settings::Settings;
use harvestrs::engines::http_engine::HttpFetchEngine;
use harvestrs::engines::optimizer::{HttpSelectorOptimizer, SelectorOptimizer};
use harvestrs::engines::traits::FetchEngine;
use harvestrs::infrastructure::repositories::job_repo_impl::InMemoryJobRepository;
use harvestrs::infrastructure::repositories::result_repo_impl::InMemoryResultRepository;
use harvestrs::infrastructure::repositories::run_repo_impl::InMemoryRunRepository;
use harvestrs::infrastructure::repositories::target_repo_impl::InMemoryTargetRepository;
use harvestrs::orchestrator::claims::TargetClaims;
use harvestrs::orchestrator::events::{
    BroadcastSubscriber, EventBus, LogSubscriber, MetricsSubscriber, RingBufferSubscriber,
};
use harvestrs::orchestrator::manager::EngineManager;
use harvestrs::orchestrator::monitor::{EngineMonitor, MonitorConfig};
use harvestrs::orchestrator::run_executor::ExecutorDeps;
use harvestrs::presentation::routes;
use harvestrs::utils::retry_policy::RetryPolicy;
use harvestrs::utils::telemetry;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting harvestrs...");

    // Initialize Prometheus Metrics
    harvestrs::infrastructure::observability::metrics::init_metrics();

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Initialize repositories
    let target_repo = Arc::new(InMemoryTargetRepository::new());
    let job_repo = Arc::new(InMemoryJobRepository::new());
    let run_repo = Arc::new(InMemoryRunRepository::new());
    let result_repo = Arc::new(InMemoryResultRepository::new());
    info!("Repositories initialized");

    // 4. Initialize collaborator clients
    let fetcher: Arc<dyn FetchEngine> = Arc::new(HttpFetchEngine::new(
        settings.fetcher.base_url.clone(),
        Duration::from_secs(settings.fetcher.timeout_secs),
    ));
    let optimizer: Option<Arc<dyn SelectorOptimizer>> = settings
        .optimizer
        .base_url
        .clone()
        .map(|url| Arc::new(HttpSelectorOptimizer::new(url)) as Arc<dyn SelectorOptimizer>);
    info!(
        fetcher = %settings.fetcher.base_url,
        optimizer_enabled = optimizer.is_some(),
        "Collaborator clients initialized"
    );

    // 5. Wire the event bus
    let ring_buffer = Arc::new(RingBufferSubscriber::new(
        settings.engine.recent_events_capacity,
    ));
    let broadcast = Arc::new(BroadcastSubscriber::new(settings.engine.broadcast_capacity));
    let mut events = EventBus::new();
    events.subscribe(Arc::new(LogSubscriber));
    events.subscribe(Arc::new(MetricsSubscriber));
    events.subscribe(ring_buffer.clone());
    events.subscribe(broadcast.clone());
    let events = Arc::new(events);
    info!("Event bus wired");

    // 6. Build the engine manager
    let deps = ExecutorDeps {
        jobs: job_repo,
        runs: run_repo,
        results: result_repo,
        targets: target_repo,
        fetcher: fetcher.clone(),
        optimizer,
        events,
        claims: Arc::new(TargetClaims::new()),
        retry_policy: RetryPolicy::standard(),
    };
    let manager = Arc::new(EngineManager::new(deps, settings.engine.runtime_config()));
    info!("Engine manager ready");

    // 7. Start the monitor loop
    let monitor_cancel = CancellationToken::new();
    let monitor = EngineMonitor::new_with_config(
        manager.clone(),
        fetcher,
        MonitorConfig {
            interval: Duration::from_secs(settings.engine.monitor_interval_secs),
            max_consecutive_failures: settings.engine.monitor_max_failures,
        },
    );
    let monitor_handle = monitor.spawn(monitor_cancel.clone());
    info!("Monitor loop started");

    // 8. Start HTTP server
    let app = routes::routes(manager.clone(), ring_buffer, broadcast);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    // 9. Drain running jobs before exit
    monitor_cancel.cancel();
    let _ = monitor_handle.await;
    manager.shutdown().await;
    info!("Shutdown complete");

    Ok(())
}
