// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::job_repository::RepositoryError;
use crate::domain::models::run::{ScrapeRun, TargetTask};
use async_trait::async_trait;
use uuid::Uuid;

/// 运行仓库特质
///
/// 定义抓取运行及其单目标任务的数据访问接口
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// 创建运行
    async fn create_run(&self, run: &ScrapeRun) -> Result<ScrapeRun, RepositoryError>;
    /// 根据ID查找运行
    async fn find_run_by_id(&self, id: Uuid) -> Result<Option<ScrapeRun>, RepositoryError>;
    /// 更新运行
    async fn update_run(&self, run: &ScrapeRun) -> Result<ScrapeRun, RepositoryError>;
    /// 查找作业的所有运行，按开始时间升序
    async fn find_runs_by_job(&self, job_id: Uuid) -> Result<Vec<ScrapeRun>, RepositoryError>;
    /// 查找作业最近的一次运行
    async fn latest_run_for_job(&self, job_id: Uuid)
        -> Result<Option<ScrapeRun>, RepositoryError>;
    /// 批量创建单目标任务
    async fn create_tasks(&self, tasks: &[TargetTask]) -> Result<(), RepositoryError>;
    /// 更新单目标任务
    async fn update_task(&self, task: &TargetTask) -> Result<TargetTask, RepositoryError>;
    /// 查找运行的所有单目标任务，按分配顺序
    async fn find_tasks_by_run(&self, run_id: Uuid) -> Result<Vec<TargetTask>, RepositoryError>;
    /// 清空运行与任务记录（硬重置的数据擦除）
    async fn clear(&self) -> Result<(), RepositoryError>;
}
