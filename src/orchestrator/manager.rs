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

use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use metrics::gauge;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::models::engine_state::{
    derive_status, EngineState, EngineStatus, RuntimeConfig,
};
use crate::domain::models::job::{JobMode, JobStatus, ScrapeJob};
use crate::domain::models::run::{ScrapeRun, TargetTask};
use crate::domain::models::target::{TargetConfig, TargetSnapshot};
use crate::domain::repositories::job_repository::JobQueryParams;
use crate::infrastructure::observability::metrics::{get_cpu_usage, get_memory_usage};
use crate::orchestrator::dispatch::{DispatchGate, TargetPacer};
use crate::orchestrator::events::EngineEvent;
use crate::orchestrator::run_executor::{ExecutorDeps, RunExecutor};
use crate::orchestrator::{EngineError, JobHandle};

/// 作业选择器
///
/// 暂停操作的作用范围：指定作业或全部运行中的作业。
#[derive(Debug, Clone)]
pub enum JobSelector {
    /// 指定的作业ID列表
    Ids(Vec<Uuid>),
    /// 所有运行中的作业
    AllRunning,
}

/// 引擎状态存储
///
/// 单锁保护的引擎全局视图，状态变更通过比较交换避免
/// 覆盖其他写入者刚做出的转换。
pub struct EngineStateStore {
    state: Mutex<EngineState>,
}

impl EngineStateStore {
    /// 使用给定的运行时配置初始化
    pub fn new(runtime_config: RuntimeConfig) -> Self {
        Self {
            state: Mutex::new(EngineState {
                runtime_config,
                ..EngineState::default()
            }),
        }
    }

    /// 当前状态的副本
    pub fn snapshot(&self) -> EngineState {
        self.state.lock().clone()
    }

    /// 在锁内更新状态
    pub fn update<F: FnOnce(&mut EngineState)>(&self, f: F) {
        f(&mut self.state.lock());
    }

    /// 仅当状态等于期望值时改写
    pub fn compare_and_set_status(&self, expected: EngineStatus, next: EngineStatus) -> bool {
        let mut state = self.state.lock();
        if state.status == expected {
            state.status = next;
            true
        } else {
            false
        }
    }

    /// 当前运行时配置的副本
    pub fn runtime_config(&self) -> RuntimeConfig {
        self.state.lock().runtime_config.clone()
    }

    /// 恢复默认状态与默认运行时配置
    pub fn reset(&self) {
        *self.state.lock() = EngineState::default();
    }
}

/// 作业与引擎状态管理器
///
/// 引擎的唯一控制入口。验证作业生命周期转换、维护目标
/// 认领和运行句柄注册表、派生引擎聚合状态，并为控制面
/// 提供查询。每个被启动的作业由一个独立的运行执行器驱动，
/// 管理器只通过取消令牌与其交互。
pub struct EngineManager {
    deps: ExecutorDeps,
    state: Arc<EngineStateStore>,
    handles: Arc<DashMap<Uuid, JobHandle>>,
    pacer: Arc<TargetPacer>,
    suspend_tx: watch::Sender<bool>,
    degraded: AtomicBool,
}

impl EngineManager {
    /// 创建状态管理器
    ///
    /// # 参数
    ///
    /// * `deps` - 仓库与协作方依赖，同一份会传递给每个运行执行器
    /// * `runtime_config` - 初始运行时配置
    pub fn new(deps: ExecutorDeps, runtime_config: RuntimeConfig) -> Self {
        let (suspend_tx, _) = watch::channel(false);
        Self {
            deps,
            state: Arc::new(EngineStateStore::new(runtime_config)),
            handles: Arc::new(DashMap::new()),
            pacer: Arc::new(TargetPacer::new()),
            suspend_tx,
            degraded: AtomicBool::new(false),
        }
    }

    /// 启动一个抓取作业
    ///
    /// 解析并独占认领全部目标，创建作业、首个运行和任务行，
    /// 然后交给新派生的运行执行器。认领是全有或全无的：任何
    /// 一个目标已被其他活跃作业持有时整个启动失败，且不留下
    /// 作业记录。
    ///
    /// # 参数
    ///
    /// * `target_ids` - 要抓取的目标ID，按期望的分发顺序
    /// * `priority` - 作业优先级
    /// * `mode` - 触发方式
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapeJob)` - 已进入Running的作业
    /// * `Err(EngineError::Validation)` - 目标列表为空或含重复项
    /// * `Err(EngineError::NotFound)` - 目标未注册或未激活
    /// * `Err(EngineError::Conflict)` - 目标已被其他作业认领
    pub async fn start_job(
        &self,
        target_ids: Vec<Uuid>,
        priority: i32,
        mode: JobMode,
    ) -> Result<ScrapeJob, EngineError> {
        if target_ids.is_empty() {
            return Err(EngineError::Validation {
                message: "target_ids must not be empty".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for id in &target_ids {
            if !seen.insert(*id) {
                return Err(EngineError::Validation {
                    message: format!("duplicate target id {}", id),
                });
            }
        }

        let found = self.deps.targets.find_by_ids(&target_ids).await?;
        let by_id: HashMap<Uuid, &TargetConfig> = found.iter().map(|t| (t.id, t)).collect();
        let mut snapshots: Vec<TargetSnapshot> = Vec::with_capacity(target_ids.len());
        for id in &target_ids {
            match by_id.get(id) {
                Some(target) if target.active => snapshots.push(target.snapshot()),
                _ => {
                    return Err(EngineError::NotFound {
                        resource: format!("Target {}", id),
                    })
                }
            }
        }

        let job = ScrapeJob::new(target_ids, priority, mode, snapshots);
        let job_id = job.id;

        // 认领在持久化之前，落败的启动不留任何痕迹
        self.deps
            .claims
            .claim_all(&job.target_ids, job_id)
            .map_err(|target_id| EngineError::Conflict { target_id })?;

        match self.launch_run(job, None).await {
            Ok(job) => Ok(job),
            Err(e) => {
                self.deps.claims.release_job(job_id);
                Err(e)
            }
        }
    }

    /// 暂停作业
    ///
    /// 取消匹配作业的运行令牌并写入Paused。非运行中的作业被
    /// 静默跳过，重复暂停是无副作用的。进行中的抓取按协作方
    /// 的取消能力结束，其结果照常记录，目标认领保留。
    ///
    /// # 参数
    ///
    /// * `selector` - 作用范围
    ///
    /// # 返回值
    ///
    /// * `Ok(u32)` - 本次实际暂停的作业数
    /// * `Err(EngineError::NotFound)` - 指定的作业ID不存在
    pub async fn pause_jobs(&self, selector: JobSelector) -> Result<u32, EngineError> {
        let candidates = match selector {
            JobSelector::Ids(ids) => {
                let mut jobs = Vec::with_capacity(ids.len());
                for id in ids {
                    let job = self.deps.jobs.find_by_id(id).await?.ok_or_else(|| {
                        EngineError::NotFound {
                            resource: format!("Job {}", id),
                        }
                    })?;
                    jobs.push(job);
                }
                jobs
            }
            JobSelector::AllRunning => self.deps.jobs.find_by_status(JobStatus::Running).await?,
        };

        let mut paused = 0u32;
        for job in candidates {
            if job.status != JobStatus::Running {
                debug!(job_id = %job.id, status = %job.status, "Pause skipped, job not running");
                continue;
            }
            let job_id = job.id;
            // 先写Paused再取消令牌，收尾中的执行器不会再把作业标成终止态
            match job.pause() {
                Ok(job) => {
                    self.deps.jobs.update(&job).await?;
                }
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "Pause transition rejected");
                    continue;
                }
            }
            if let Some(handle) = self.handles.get(&job_id) {
                handle.cancel.cancel();
            }
            self.deps
                .events
                .publish(EngineEvent::JobPaused { job_id });
            info!(job_id = %job_id, "Job paused");
            paused += 1;
        }
        Ok(paused)
    }

    /// 恢复一个暂停的作业
    ///
    /// 从最近一次运行中收集未终止的任务，为它们创建带继承
    /// 尝试次数的新运行，然后重新进入Running。目标认领自暂停
    /// 起一直保留，恢复不需要重新认领。
    ///
    /// # 参数
    ///
    /// * `job_id` - 作业ID
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapeJob)` - 重新进入Running的作业
    /// * `Err(EngineError::NotFound)` - 作业不存在
    /// * `Err(EngineError::InvalidState)` - 作业不处于Paused
    pub async fn resume_job(&self, job_id: Uuid) -> Result<ScrapeJob, EngineError> {
        let job = self.deps.jobs.find_by_id(job_id).await?.ok_or_else(|| {
            EngineError::NotFound {
                resource: format!("Job {}", job_id),
            }
        })?;
        let job = job.resume()?;

        let latest = self
            .deps
            .runs
            .latest_run_for_job(job_id)
            .await?
            .ok_or_else(|| EngineError::InvalidState {
                reason: format!("job {} has no run to resume", job_id),
            })?;
        let prior = self.deps.runs.find_tasks_by_run(latest.id).await?;
        let remaining: Vec<(Uuid, u32)> = prior
            .iter()
            .filter(|t| !t.status.is_terminal())
            .map(|t| (t.target_id, t.attempt_count))
            .collect();

        info!(
            job_id = %job_id,
            remaining = remaining.len(),
            "Resuming job"
        );
        self.launch_run(job, Some(remaining)).await
    }

    /// 硬重置引擎
    ///
    /// 取消所有活跃作业并等待其执行器退出，释放全部目标认领，
    /// 将引擎状态与运行时配置恢复为默认值。`wipe_data`额外清空
    /// 作业、运行与结果历史；`wipe_config`额外清空目标注册表。
    /// 两个开关相互独立，默认都关闭。
    ///
    /// # 参数
    ///
    /// * `confirm` - 必须为true，防止误触
    /// * `wipe_data` - 是否清空抓取历史
    /// * `wipe_config` - 是否清空目标注册表
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 重置完成
    /// * `Err(EngineError::InvalidState)` - 未确认
    pub async fn hard_reset(
        &self,
        confirm: bool,
        wipe_data: bool,
        wipe_config: bool,
    ) -> Result<(), EngineError> {
        if !confirm {
            return Err(EngineError::InvalidState {
                reason: "hard reset requires confirm=true".to_string(),
            });
        }

        // 销毁动作之前先收集全部活跃作业
        let mut active = self.deps.jobs.find_by_status(JobStatus::Running).await?;
        active.extend(self.deps.jobs.find_by_status(JobStatus::Paused).await?);
        active.extend(self.deps.jobs.find_by_status(JobStatus::Pending).await?);

        warn!(
            active_jobs = active.len(),
            wipe_data, wipe_config, "Hard reset requested"
        );

        for job in active {
            let job_id = job.id;
            if let Some((_, handle)) = self.handles.remove(&job_id) {
                handle.cancel.cancel();
                if let Err(e) = handle.join.await {
                    error!(job_id = %job_id, error = %e, "Run executor did not exit cleanly");
                }
            }
            // 执行器排空后从仓库重读，拿到它最后写入的任务计数
            let job = match self.deps.jobs.find_by_id(job_id).await? {
                Some(job) => job,
                None => continue,
            };
            match job.cancel() {
                Ok(job) => {
                    self.deps.jobs.update(&job).await?;
                    self.deps
                        .events
                        .publish(EngineEvent::JobCancelled { job_id });
                }
                Err(e) => debug!(job_id = %job_id, error = %e, "Job already terminal during reset"),
            }
        }

        self.deps.claims.clear();
        self.pacer.clear();

        if wipe_data {
            self.deps.runs.clear().await?;
            self.deps.results.clear().await?;
            self.deps.jobs.clear().await?;
        }
        if wipe_config {
            self.deps.targets.clear().await?;
        }

        self.state.reset();
        if self.degraded.load(Ordering::SeqCst) {
            self.state
                .compare_and_set_status(EngineStatus::Idle, EngineStatus::Degraded);
        }
        info!("Hard reset completed");
        Ok(())
    }

    /// 心跳：重算引擎聚合状态
    ///
    /// 统计活跃作业、今日抓取汇总、资源占用，派生引擎状态并
    /// 写入状态存储。监控循环定期调用，控制面也可按需触发。
    pub async fn heartbeat(&self) -> Result<EngineState, EngineError> {
        let running = self.deps.jobs.find_by_status(JobStatus::Running).await?.len() as u32;
        let paused = self.deps.jobs.find_by_status(JobStatus::Paused).await?.len() as u32;
        let degraded = self.degraded.load(Ordering::SeqCst);
        let status = derive_status(running, paused, degraded);

        let midnight = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let stats = self.deps.results.stats_since(midnight).await?;
        let total = stats.succeeded + stats.failed;
        let success_rate = if total == 0 {
            1.0
        } else {
            stats.succeeded as f64 / total as f64
        };

        let active_jobs = running + paused;
        self.state.update(|state| {
            state.status = status;
            state.active_jobs = active_jobs;
            state.targets_completed_today = stats.succeeded;
            state.targets_failed_today = stats.failed;
            state.success_rate = success_rate;
            state.last_heartbeat = Utc::now();
            state.cpu_usage = get_cpu_usage();
            state.memory_usage = get_memory_usage();
        });

        gauge!("engine_active_jobs").set(active_jobs as f64);
        gauge!("engine_status").set(match status {
            EngineStatus::Idle => 0.0,
            EngineStatus::Paused => 0.5,
            EngineStatus::Running => 1.0,
            EngineStatus::Degraded => -1.0,
        });

        Ok(self.state.snapshot())
    }

    /// 最近一次心跳的状态快照，不触发重算
    pub fn engine_state(&self) -> EngineState {
        self.state.snapshot()
    }

    /// 标记协作方不可达
    ///
    /// 抬起分发挂起标志，已在执行的抓取不受影响。重复标记
    /// 不重复发事件。
    pub fn mark_degraded(&self, reason: &str) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            let _ = self.suspend_tx.send(true);
            self.state.update(|s| s.status = EngineStatus::Degraded);
            self.deps.events.publish(EngineEvent::EngineDegraded {
                reason: reason.to_string(),
            });
            warn!(reason, "Fetch collaborator unreachable, dispatch suspended");
        }
    }

    /// 协作方恢复可达
    ///
    /// 放下挂起标志，等待中的分发立即继续。聚合状态在下一次
    /// 心跳重算，这里只把Degraded让位。
    pub fn mark_recovered(&self) {
        if self.degraded.swap(false, Ordering::SeqCst) {
            let _ = self.suspend_tx.send(false);
            self.state
                .compare_and_set_status(EngineStatus::Degraded, EngineStatus::Idle);
            self.deps.events.publish(EngineEvent::EngineRecovered);
            info!("Fetch collaborator reachable again, dispatch resumed");
        }
    }

    /// 当前是否处于降级状态
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// 查询作业，按创建时间倒序
    pub async fn query_jobs(&self, params: JobQueryParams) -> Result<Vec<ScrapeJob>, EngineError> {
        Ok(self.deps.jobs.query(params).await?)
    }

    /// 单个作业及其最近一次运行
    pub async fn get_job(
        &self,
        job_id: Uuid,
    ) -> Result<(ScrapeJob, Option<ScrapeRun>), EngineError> {
        let job = self.deps.jobs.find_by_id(job_id).await?.ok_or_else(|| {
            EngineError::NotFound {
                resource: format!("Job {}", job_id),
            }
        })?;
        let latest = self.deps.runs.latest_run_for_job(job_id).await?;
        Ok((job, latest))
    }

    /// 作业的全部运行，按创建顺序
    pub async fn runs_for_job(&self, job_id: Uuid) -> Result<Vec<ScrapeRun>, EngineError> {
        Ok(self.deps.runs.find_runs_by_job(job_id).await?)
    }

    /// 单次运行及其按分配顺序排列的任务
    pub async fn get_run(
        &self,
        run_id: Uuid,
    ) -> Result<(ScrapeRun, Vec<TargetTask>), EngineError> {
        let run = self
            .deps
            .runs
            .find_run_by_id(run_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                resource: format!("Run {}", run_id),
            })?;
        let tasks = self.deps.runs.find_tasks_by_run(run_id).await?;
        Ok((run, tasks))
    }

    /// 注册一个目标
    pub async fn create_target(
        &self,
        target: TargetConfig,
    ) -> Result<TargetConfig, EngineError> {
        Ok(self.deps.targets.create(&target).await?)
    }

    /// 读取一个目标
    pub async fn get_target(&self, id: Uuid) -> Result<TargetConfig, EngineError> {
        self.deps
            .targets
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                resource: format!("Target {}", id),
            })
    }

    /// 列出目标
    pub async fn list_targets(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<TargetConfig>, EngineError> {
        Ok(self.deps.targets.list(include_inactive).await?)
    }

    /// 更新一个目标
    ///
    /// 只影响之后启动的作业，已持有快照的运行不受影响。
    pub async fn update_target(
        &self,
        mut target: TargetConfig,
    ) -> Result<TargetConfig, EngineError> {
        target.updated_at = Utc::now();
        Ok(self.deps.targets.update(&target).await?)
    }

    /// 删除一个目标
    ///
    /// 被活跃作业认领的目标不能删除。
    pub async fn delete_target(&self, id: Uuid) -> Result<(), EngineError> {
        if let Some(job_id) = self.deps.claims.holder(id) {
            debug!(target_id = %id, job_id = %job_id, "Delete refused, target claimed");
            return Err(EngineError::Conflict { target_id: id });
        }
        self.deps
            .targets
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                resource: format!("Target {}", id),
            })?;
        self.deps.targets.delete(id).await?;
        Ok(())
    }

    /// 优雅停机：暂停全部运行中的作业并等待执行器退出
    pub async fn shutdown(&self) {
        match self.pause_jobs(JobSelector::AllRunning).await {
            Ok(count) if count > 0 => info!(paused = count, "Paused running jobs for shutdown"),
            Ok(_) => {}
            Err(e) => error!(error = %e, "Failed to pause jobs during shutdown"),
        }
        let job_ids: Vec<Uuid> = self.handles.iter().map(|entry| *entry.key()).collect();
        let mut draining = Vec::with_capacity(job_ids.len());
        for job_id in job_ids {
            if let Some((_, handle)) = self.handles.remove(&job_id) {
                draining.push(async move { (job_id, handle.join.await) });
            }
        }
        for (job_id, result) in join_all(draining).await {
            if let Err(e) = result {
                error!(job_id = %job_id, error = %e, "Run executor did not exit cleanly");
            }
        }
    }

    /// 为作业创建一次运行并派生执行器
    ///
    /// `carried`为None时按作业的目标顺序创建全新任务；否则
    /// 使用给定的(目标, 已耗尝试数)列表。作业在运行和任务行
    /// 持久化之后转入Running。
    async fn launch_run(
        &self,
        job: ScrapeJob,
        carried: Option<Vec<(Uuid, u32)>>,
    ) -> Result<ScrapeJob, EngineError> {
        let resumed = carried.is_some();
        let job_id = job.id;
        let seeds: Vec<(Uuid, u32)> = match carried {
            Some(seeds) => seeds,
            None => job.target_ids.iter().map(|id| (*id, 0)).collect(),
        };

        let run = ScrapeRun::new(job_id, seeds.len() as u32);
        let tasks: Vec<TargetTask> = seeds
            .iter()
            .map(|(target_id, attempts)| TargetTask::new(run.id, job_id, *target_id, *attempts))
            .collect();
        self.deps.runs.create_run(&run).await?;
        self.deps.runs.create_tasks(&tasks).await?;

        if !resumed {
            self.deps.jobs.create(&job).await?;
            self.deps.events.publish(EngineEvent::JobCreated {
                job_id,
                target_count: job.target_ids.len() as u32,
            });
        }

        let job = match job.status {
            JobStatus::Pending => job.start()?,
            _ => job,
        };
        self.deps.jobs.update(&job).await?;

        let runtime = self.state.runtime_config();
        let gate = DispatchGate::new(
            runtime.max_concurrent_targets,
            self.pacer.clone(),
            self.suspend_tx.subscribe(),
        );
        let snapshots: HashMap<Uuid, TargetSnapshot> = job
            .snapshots
            .iter()
            .map(|s| (s.target_id, s.clone()))
            .collect();
        let cancel = CancellationToken::new();
        let executor = RunExecutor::new(
            self.deps.clone(),
            gate,
            run.clone(),
            snapshots,
            runtime.default_max_retries,
            cancel.clone(),
            self.handles.clone(),
        );
        let join = tokio::spawn(executor.run(tasks));
        self.handles.insert(
            job_id,
            JobHandle {
                run_id: run.id,
                cancel,
                join,
            },
        );

        if resumed {
            self.deps.events.publish(EngineEvent::JobResumed {
                job_id,
                run_id: run.id,
            });
        } else {
            self.deps.events.publish(EngineEvent::JobStarted {
                job_id,
                run_id: run.id,
            });
        }
        Ok(job)
    }
}
