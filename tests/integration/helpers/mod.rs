// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use harvestrs::domain::models::engine_state::RuntimeConfig;
use harvestrs::domain::models::job::JobStatus;
use harvestrs::domain::models::run::TargetTaskStatus;
use harvestrs::domain::models::target::{FetchMode, TargetConfig, TargetSnapshot};
use harvestrs::domain::repositories::job_repository::JobRepository;
use harvestrs::domain::repositories::run_repository::RunRepository;
use harvestrs::domain::repositories::target_repository::TargetRepository;
use harvestrs::engines::traits::{FetchEngine, FetchError, FetchOutcome};
use harvestrs::infrastructure::repositories::job_repo_impl::InMemoryJobRepository;
use harvestrs::infrastructure::repositories::result_repo_impl::InMemoryResultRepository;
use harvestrs::infrastructure::repositories::run_repo_impl::InMemoryRunRepository;
use harvestrs::infrastructure::repositories::target_repo_impl::InMemoryTargetRepository;
use harvestrs::orchestrator::claims::TargetClaims;
use harvestrs::orchestrator::events::{BroadcastSubscriber, EventBus, RingBufferSubscriber};
use harvestrs::orchestrator::manager::EngineManager;
use harvestrs::orchestrator::run_executor::ExecutorDeps;
use harvestrs::presentation::routes;
use harvestrs::utils::retry_policy::RetryPolicy;

/// 按目标写好剧本的抓取引擎
///
/// 每个目标持有一个结局队列，抓取时按序弹出，队列耗尽后
/// 一律成功。带放行闸门的变体让测试精确控制每次抓取完成
/// 的时机，用于在抓取进行中触发暂停或重置。
pub struct ScriptedFetchEngine {
    scripts: Mutex<HashMap<Uuid, VecDeque<Result<FetchOutcome, FetchError>>>>,
    gate: Option<Semaphore>,
    in_flight: AtomicU32,
    total_calls: AtomicU32,
}

impl ScriptedFetchEngine {
    /// 抓取立即完成的引擎
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            gate: None,
            in_flight: AtomicU32::new(0),
            total_calls: AtomicU32::new(0),
        }
    }

    /// 抓取阻塞到被放行的引擎
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    /// 为一个目标写入结局剧本
    pub fn script(&self, target_id: Uuid, outcomes: Vec<Result<FetchOutcome, FetchError>>) {
        self.scripts.lock().insert(target_id, outcomes.into());
    }

    /// 放行n次被闸门挡住的抓取
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// 当前正在抓取中的任务数
    pub fn in_flight(&self) -> u32 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// 累计收到的抓取调用数
    pub fn total_calls(&self) -> u32 {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// 标准成功结局
    pub fn ok_outcome() -> FetchOutcome {
        FetchOutcome {
            status_code: 200,
            response_time_ms: 8,
            extracted_count: 4,
        }
    }

    async fn fetch_inner(
        &self,
        snapshot: &TargetSnapshot,
        cancel: CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        if let Some(gate) = &self.gate {
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                permit = gate.acquire() => match permit {
                    Ok(p) => p.forget(),
                    Err(_) => return Err(FetchError::Cancelled),
                },
            }
        }
        let scripted = self
            .scripts
            .lock()
            .get_mut(&snapshot.target_id)
            .and_then(|queue| queue.pop_front());
        scripted.unwrap_or_else(|| Ok(Self::ok_outcome()))
    }
}

#[async_trait]
impl FetchEngine for ScriptedFetchEngine {
    async fn fetch(
        &self,
        snapshot: &TargetSnapshot,
        cancel: CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = self.fetch_inner(snapshot, cancel).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn probe(&self) -> Result<(), FetchError> {
        Ok(())
    }

    fn cancellable(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// 组装好的被测应用
#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub manager: Arc<EngineManager>,
    pub fetcher: Arc<ScriptedFetchEngine>,
    pub jobs: Arc<InMemoryJobRepository>,
    pub runs: Arc<InMemoryRunRepository>,
    pub results: Arc<InMemoryResultRepository>,
    pub targets: Arc<InMemoryTargetRepository>,
    pub claims: Arc<TargetClaims>,
    pub ring_buffer: Arc<RingBufferSubscriber>,
}

/// 被测应用的可调参数
pub struct TestAppOptions {
    pub max_concurrent_targets: usize,
    pub retry_policy: RetryPolicy,
    pub gated_fetcher: bool,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            max_concurrent_targets: 5,
            retry_policy: RetryPolicy::fast(),
            gated_fetcher: false,
        }
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_options(TestAppOptions::default()).await
}

pub async fn create_test_app_with_options(options: TestAppOptions) -> TestApp {
    let targets = Arc::new(InMemoryTargetRepository::new());
    let jobs = Arc::new(InMemoryJobRepository::new());
    let runs = Arc::new(InMemoryRunRepository::new());
    let results = Arc::new(InMemoryResultRepository::new());
    let claims = Arc::new(TargetClaims::new());

    let fetcher = Arc::new(if options.gated_fetcher {
        ScriptedFetchEngine::gated()
    } else {
        ScriptedFetchEngine::new()
    });

    let ring_buffer = Arc::new(RingBufferSubscriber::new(100));
    let broadcast = Arc::new(BroadcastSubscriber::new(64));
    let mut events = EventBus::new();
    events.subscribe(ring_buffer.clone());
    events.subscribe(broadcast.clone());

    let deps = ExecutorDeps {
        jobs: jobs.clone(),
        runs: runs.clone(),
        results: results.clone(),
        targets: targets.clone(),
        fetcher: fetcher.clone(),
        optimizer: None,
        events: Arc::new(events),
        claims: claims.clone(),
        retry_policy: options.retry_policy,
    };
    let manager = Arc::new(EngineManager::new(
        deps,
        RuntimeConfig {
            max_concurrent_targets: options.max_concurrent_targets,
            default_max_retries: 3,
        },
    ));

    let server = TestServer::new(routes::routes(
        manager.clone(),
        ring_buffer.clone(),
        broadcast,
    ))
    .expect("test server should build");

    TestApp {
        server,
        manager,
        fetcher,
        jobs,
        runs,
        results,
        targets,
        claims,
        ring_buffer,
    }
}

/// 直接向仓库注册一个目标，返回其ID
pub async fn register_target(app: &TestApp, name: &str) -> Uuid {
    register_target_with(app, name, 0, 3).await
}

pub async fn register_target_with(
    app: &TestApp,
    name: &str,
    rate_limit_delay_ms: u64,
    max_retries: u32,
) -> Uuid {
    let slug = name.replace(' ', "-").to_lowercase();
    let mut target = TargetConfig::new(
        name.to_string(),
        FetchMode::StructuredFeed,
        format!("https://jobs.example.com/{}/feed", slug),
    );
    target.rate_limit_delay_ms = rate_limit_delay_ms;
    target.max_retries = max_retries;
    app.targets
        .create(&target)
        .await
        .expect("target registration should succeed");
    target.id
}

/// 轮询等待作业进入期望状态
pub async fn wait_for_job_status(app: &TestApp, job_id: Uuid, expected: JobStatus) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let current = app
            .jobs
            .find_by_id(job_id)
            .await
            .expect("job lookup should succeed")
            .map(|job| job.status);
        if current == Some(expected) {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "job {} did not reach {:?} in time, last seen {:?}",
                job_id, expected, current
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// 轮询等待进行中的抓取数达到期望值
pub async fn wait_for_in_flight(app: &TestApp, expected: u32) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while app.fetcher.in_flight() != expected {
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "in-flight fetches stuck at {}, wanted {}",
                app.fetcher.in_flight(),
                expected
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// 轮询等待累计抓取调用数达到期望值
pub async fn wait_for_total_calls(app: &TestApp, expected: u32) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while app.fetcher.total_calls() < expected {
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "fetch calls stuck at {}, wanted {}",
                app.fetcher.total_calls(),
                expected
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// 轮询等待一次运行中成功完成的任务数达到期望值
pub async fn wait_for_completed_tasks(app: &TestApp, run_id: Uuid, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let completed = app
            .runs
            .find_tasks_by_run(run_id)
            .await
            .expect("task lookup should succeed")
            .iter()
            .filter(|task| task.status == TargetTaskStatus::Completed)
            .count();
        if completed == expected {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "run {} completed {} tasks, wanted {}",
                run_id, completed, expected
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
