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

use dashmap::DashMap;
use metrics::counter;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::models::run::{ScrapeRun, TargetTask};
use crate::domain::models::scrape_result::ScrapeResult;
use crate::domain::models::target::TargetSnapshot;
use crate::domain::repositories::job_repository::JobRepository;
use crate::domain::repositories::result_repository::ResultRepository;
use crate::domain::repositories::run_repository::RunRepository;
use crate::domain::repositories::target_repository::TargetRepository;
use crate::engines::optimizer::SelectorOptimizer;
use crate::engines::traits::{FetchEngine, FetchError, FetchOutcome};
use crate::orchestrator::claims::TargetClaims;
use crate::orchestrator::dispatch::DispatchGate;
use crate::orchestrator::events::{EngineEvent, EventBus};
use crate::orchestrator::progress::ProgressTracker;
use crate::orchestrator::JobHandle;
use crate::utils::retry_policy::{RetryDecision, RetryPolicy};

/// 执行器依赖集合
///
/// 状态管理器构造后交给每个运行执行器，全部为共享引用。
#[derive(Clone)]
pub struct ExecutorDeps {
    pub jobs: Arc<dyn JobRepository>,
    pub runs: Arc<dyn RunRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub targets: Arc<dyn TargetRepository>,
    pub fetcher: Arc<dyn FetchEngine>,
    pub optimizer: Option<Arc<dyn SelectorOptimizer>>,
    pub events: Arc<EventBus>,
    pub claims: Arc<TargetClaims>,
    pub retry_policy: RetryPolicy,
}

/// 运行执行器
///
/// 每次运行一个tokio任务，驱动该运行的完整生命周期：
/// 按创建顺序分发任务、控制并发与节流、根据重试策略
/// 安排延迟重试、在全部任务终止后收尾作业。
pub struct RunExecutor {
    deps: ExecutorDeps,
    gate: DispatchGate,
    job_id: Uuid,
    run: ScrapeRun,
    snapshots: HashMap<Uuid, TargetSnapshot>,
    default_max_retries: u32,
    cancel: CancellationToken,
    handles: Arc<DashMap<Uuid, JobHandle>>,
}

impl RunExecutor {
    /// 创建运行执行器
    ///
    /// # 参数
    ///
    /// * `deps` - 共享依赖
    /// * `gate` - 本次运行的分发闸门，并发上限已捕获
    /// * `run` - 要执行的运行
    /// * `snapshots` - 目标快照，按目标ID索引
    /// * `default_max_retries` - 快照缺失时使用的重试预算
    /// * `cancel` - 取消令牌
    /// * `handles` - 作业句柄注册表，执行器退出时清理自己的条目
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        deps: ExecutorDeps,
        gate: DispatchGate,
        run: ScrapeRun,
        snapshots: HashMap<Uuid, TargetSnapshot>,
        default_max_retries: u32,
        cancel: CancellationToken,
        handles: Arc<DashMap<Uuid, JobHandle>>,
    ) -> Self {
        Self {
            deps,
            gate,
            job_id: run.job_id,
            run,
            snapshots,
            default_max_retries,
            cancel,
            handles,
        }
    }

    /// 执行运行直到全部任务终止或被取消
    #[instrument(skip_all, fields(job_id = %self.job_id, run_id = %self.run.id))]
    pub async fn run(self, tasks: Vec<TargetTask>) {
        let total = tasks.len() as u32;
        let progress = ProgressTracker::new(total);
        let mut ready: VecDeque<TargetTask> = tasks.into();
        let mut delayed: Vec<(Instant, TargetTask)> = Vec::new();
        let mut in_flight: JoinSet<(TargetTask, Result<FetchOutcome, FetchError>)> =
            JoinSet::new();
        let mut interrupted = false;

        info!(targets = total, "Run executor started");

        loop {
            // 到期的延迟任务移回待分发队列
            let now = Instant::now();
            let mut i = 0;
            while i < delayed.len() {
                if delayed[i].0 <= now {
                    let (_, task) = delayed.remove(i);
                    ready.push_back(task);
                } else {
                    i += 1;
                }
            }

            // 队首被节流的任务直接进延迟队列，不占用全局许可
            while let Some(target_id) = ready.front().map(|t| t.target_id) {
                let spacing = self.spacing_for(target_id);
                if spacing.is_zero() {
                    break;
                }
                match self.gate.pacer().check(target_id) {
                    Ok(()) => break,
                    Err(allowed_at) => {
                        if let Some(task) = ready.pop_front() {
                            debug!(target_id = %target_id, "Target paced, deferring dispatch");
                            delayed.push((allowed_at, task));
                        }
                    }
                }
            }

            if ready.is_empty() && delayed.is_empty() && in_flight.is_empty() {
                break;
            }

            let next_due = delayed.iter().map(|(at, _)| *at).min();
            let due = next_due.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    interrupted = true;
                    break;
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    match joined {
                        Ok((task, outcome)) => {
                            self.handle_outcome(task, outcome, &progress, &mut delayed).await;
                        }
                        Err(e) => error!(error = %e, "Fetch task panicked"),
                    }
                }
                _ = tokio::time::sleep_until(due), if next_due.is_some() => {}
                permit = self.gate.acquire(), if !ready.is_empty() => {
                    if let Some(task) = ready.pop_front() {
                        self.dispatch(task, permit, &progress, &mut delayed, &mut in_flight).await;
                    }
                }
            }
        }

        if interrupted {
            debug!("Run cancelled, draining in-flight fetches");
            while let Some(joined) = in_flight.join_next().await {
                match joined {
                    Ok((task, outcome)) => {
                        self.handle_outcome(task, outcome, &progress, &mut delayed).await;
                    }
                    Err(e) => error!(error = %e, "Fetch task panicked"),
                }
            }
        }

        self.finish(&progress, interrupted).await;
    }

    /// 分发一个任务
    ///
    /// 许可已持有。节流预约失败时任务回到延迟队列并放弃许可。
    async fn dispatch(
        &self,
        task: TargetTask,
        permit: tokio::sync::OwnedSemaphorePermit,
        progress: &ProgressTracker,
        delayed: &mut Vec<(Instant, TargetTask)>,
        in_flight: &mut JoinSet<(TargetTask, Result<FetchOutcome, FetchError>)>,
    ) {
        let target_id = task.target_id;
        let spacing = self.spacing_for(target_id);

        // 等待许可期间节流窗口可能被其他运行占用，预约前再查一次
        if let Err(allowed_at) = self.gate.pacer().try_reserve(target_id, spacing) {
            delayed.push((allowed_at, task));
            drop(permit);
            return;
        }

        let task = match task.begin_attempt() {
            Ok(task) => task,
            Err(e) => {
                error!(target_id = %target_id, error = %e, "Task cannot begin attempt");
                return;
            }
        };
        if let Err(e) = self.deps.runs.update_task(&task).await {
            error!(task_id = %task.id, error = %e, "Failed to persist task dispatch");
        }
        progress.mark_in_progress();
        self.deps.events.publish(EngineEvent::TargetStarted {
            job_id: self.job_id,
            run_id: self.run.id,
            target_id,
            attempt: task.attempt_count,
        });

        let snapshot = self.snapshots.get(&target_id).cloned();
        let fetcher = self.deps.fetcher.clone();
        let cancel = self.cancel.child_token();
        in_flight.spawn(async move {
            let _permit = permit;
            let result = match snapshot {
                Some(snapshot) => fetcher.fetch(&snapshot, cancel).await,
                None => Err(FetchError::InvalidConfig(
                    "missing target snapshot".to_string(),
                )),
            };
            (task, result)
        });
    }

    /// 处理一次抓取的结果
    async fn handle_outcome(
        &self,
        task: TargetTask,
        outcome: Result<FetchOutcome, FetchError>,
        progress: &ProgressTracker,
        delayed: &mut Vec<(Instant, TargetTask)>,
    ) {
        let target_id = task.target_id;

        match outcome {
            Ok(fetched) => {
                let row = ScrapeResult::success(
                    task.id,
                    self.run.id,
                    target_id,
                    fetched.status_code,
                    fetched.response_time_ms,
                    fetched.extracted_count,
                );
                if let Err(e) = self.deps.results.append(&row).await {
                    error!(task_id = %task.id, error = %e, "Failed to append scrape result");
                }
                match task.complete(row.id) {
                    Ok(task) => {
                        if let Err(e) = self.deps.runs.update_task(&task).await {
                            error!(task_id = %task.id, error = %e, "Failed to persist task completion");
                        }
                    }
                    Err(e) => error!(target_id = %target_id, error = %e, "Invalid task completion"),
                }
                if let Err(e) = self.deps.targets.record_outcome(target_id, true).await {
                    debug!(target_id = %target_id, error = %e, "Could not update target success rate");
                }
                progress.mark_completed();
                self.deps.events.publish(EngineEvent::TargetCompleted {
                    job_id: self.job_id,
                    run_id: self.run.id,
                    target_id,
                    extracted_count: fetched.extracted_count,
                    response_time_ms: fetched.response_time_ms,
                });
                self.publish_progress(progress);
            }
            Err(FetchError::Cancelled) => {
                // 暂停中止了本次尝试，不记录结果，预算退还
                match task.abort_attempt() {
                    Ok(task) => {
                        if let Err(e) = self.deps.runs.update_task(&task).await {
                            error!(task_id = %task.id, error = %e, "Failed to persist task abort");
                        }
                    }
                    Err(e) => error!(target_id = %target_id, error = %e, "Invalid task abort"),
                }
                progress.mark_requeued();
            }
            Err(err) => {
                let kind = err.kind();
                let message = err.to_string();
                let status_code = match &err {
                    FetchError::Rejected { status } | FetchError::Upstream { status } => {
                        Some(*status)
                    }
                    _ => None,
                };
                let row = ScrapeResult::failure(
                    task.id,
                    self.run.id,
                    target_id,
                    kind,
                    message.clone(),
                    status_code,
                    0,
                );
                if let Err(e) = self.deps.results.append(&row).await {
                    error!(task_id = %task.id, error = %e, "Failed to append scrape result");
                }
                if let Err(e) = self.deps.targets.record_outcome(target_id, false).await {
                    debug!(target_id = %target_id, error = %e, "Could not update target success rate");
                }

                let max_retries = self
                    .snapshots
                    .get(&target_id)
                    .map(|s| s.max_retries)
                    .unwrap_or(self.default_max_retries);

                match self
                    .deps
                    .retry_policy
                    .decide(task.attempt_count, max_retries, kind)
                {
                    RetryDecision::RetryAfter(delay) => {
                        counter!("target_task_retries_total").increment(1);
                        let wait = delay.max(self.spacing_for(target_id));
                        warn!(
                            target_id = %target_id,
                            attempt = task.attempt_count,
                            retry_in_ms = wait.as_millis() as u64,
                            error = %message,
                            "Target fetch failed, retry scheduled"
                        );
                        match task.requeue(message) {
                            Ok(task) => {
                                if let Err(e) = self.deps.runs.update_task(&task).await {
                                    error!(task_id = %task.id, error = %e, "Failed to persist task requeue");
                                }
                                delayed.push((Instant::now() + wait, task));
                                progress.mark_requeued();
                            }
                            Err(e) => error!(target_id = %target_id, error = %e, "Invalid task requeue"),
                        }
                    }
                    RetryDecision::GiveUp => {
                        match task.fail(message.clone()) {
                            Ok(task) => {
                                if let Err(e) = self.deps.runs.update_task(&task).await {
                                    error!(task_id = %task.id, error = %e, "Failed to persist task failure");
                                }
                            }
                            Err(e) => error!(target_id = %target_id, error = %e, "Invalid task failure"),
                        }
                        progress.mark_failed();
                        self.deps.events.publish(EngineEvent::TargetFailed {
                            job_id: self.job_id,
                            run_id: self.run.id,
                            target_id,
                            error: message,
                        });
                        self.publish_progress(progress);
                    }
                }
            }
        }
    }

    /// 收尾：关闭运行，必要时终止作业并释放认领
    async fn finish(self, progress: &ProgressTracker, interrupted: bool) {
        let snap = progress.snapshot();
        let avg = self.average_response_time().await;
        let run = self.run.clone().close(snap.completed, snap.failed, avg);
        if let Err(e) = self.deps.runs.update_run(&run).await {
            error!(run_id = %run.id, error = %e, "Failed to close run");
        }

        let run_id = self.run.id;
        self.handles
            .remove_if(&self.job_id, |_, handle| handle.run_id == run_id);

        if interrupted {
            // 作业的暂停或取消状态由状态管理器负责写入，认领保留
            info!(
                completed = snap.completed,
                failed = snap.failed,
                "Run interrupted, remaining tasks kept for resume"
            );
            return;
        }

        let job_succeeded = self.job_has_success(run.completed_targets).await;
        match self.deps.jobs.find_by_id(self.job_id).await {
            Ok(Some(job)) => {
                let transition = if job_succeeded {
                    job.complete()
                } else {
                    job.fail()
                };
                match transition {
                    Ok(job) => {
                        if let Err(e) = self.deps.jobs.update(&job).await {
                            error!(job_id = %job.id, error = %e, "Failed to persist job completion");
                        }
                        self.deps.claims.release_job(self.job_id);
                        if job_succeeded {
                            self.deps.events.publish(EngineEvent::JobCompleted {
                                job_id: self.job_id,
                                completed_targets: snap.completed,
                                failed_targets: snap.failed,
                            });
                        } else {
                            self.deps.events.publish(EngineEvent::JobFailed {
                                job_id: self.job_id,
                                failed_targets: snap.failed,
                            });
                        }
                        self.consult_optimizer();
                    }
                    Err(e) => {
                        // 作业在收尾瞬间被暂停或取消，交给状态管理器
                        warn!(job_id = %self.job_id, error = %e, "Job left terminal handling to manager");
                    }
                }
            }
            Ok(None) => warn!(job_id = %self.job_id, "Job disappeared before completion"),
            Err(e) => error!(job_id = %self.job_id, error = %e, "Failed to load job for completion"),
        }
    }

    /// 作业是否有过成功抓取，跨所有运行统计
    async fn job_has_success(&self, current_run_completed: u32) -> bool {
        if current_run_completed > 0 {
            return true;
        }
        match self.deps.runs.find_runs_by_job(self.job_id).await {
            Ok(runs) => runs.iter().any(|r| r.completed_targets > 0),
            Err(e) => {
                error!(job_id = %self.job_id, error = %e, "Failed to load runs for job");
                false
            }
        }
    }

    /// 本次运行成功抓取的平均响应时间
    async fn average_response_time(&self) -> Option<u64> {
        let results = match self.deps.results.find_by_run(self.run.id).await {
            Ok(results) => results,
            Err(e) => {
                error!(run_id = %self.run.id, error = %e, "Failed to load run results");
                return None;
            }
        };
        let times: Vec<u64> = results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.response_time_ms)
            .collect();
        if times.is_empty() {
            None
        } else {
            Some(times.iter().sum::<u64>() / times.len() as u64)
        }
    }

    /// 运行完成后请求优化建议，失败只记录
    fn consult_optimizer(&self) {
        let optimizer = match self.deps.optimizer.clone() {
            Some(optimizer) => optimizer,
            None => return,
        };
        let results = self.deps.results.clone();
        let target_ids: Vec<Uuid> = self.snapshots.keys().copied().collect();

        tokio::spawn(async move {
            for target_id in target_ids {
                let recent = match results.find_recent_by_target(target_id, 20).await {
                    Ok(recent) => recent,
                    Err(e) => {
                        warn!(target_id = %target_id, error = %e, "Failed to load results for optimizer");
                        continue;
                    }
                };
                if recent.is_empty() {
                    continue;
                }
                match optimizer.suggest(target_id, &recent).await {
                    Ok(Some(delta)) => {
                        info!(
                            target_id = %target_id,
                            note = delta.note.as_deref().unwrap_or("-"),
                            "Optimizer suggestion available"
                        );
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(target_id = %target_id, error = %e, "Optimizer consultation failed");
                    }
                }
            }
        });
    }

    fn publish_progress(&self, progress: &ProgressTracker) {
        let snap = progress.snapshot();
        self.deps.events.publish(EngineEvent::ProgressUpdate {
            job_id: self.job_id,
            run_id: self.run.id,
            completed: snap.completed,
            failed: snap.failed,
            total: snap.total,
            percentage: snap.percentage,
            eta_seconds: snap.eta_seconds,
        });
    }

    fn spacing_for(&self, target_id: Uuid) -> Duration {
        self.snapshots
            .get(&target_id)
            .map(|s| Duration::from_millis(s.rate_limit_delay_ms))
            .unwrap_or(Duration::ZERO)
    }
}
