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

use crate::domain::models::run::{ScrapeRun, TargetTask};
use crate::domain::repositories::job_repository::RepositoryError;
use crate::domain::repositories::run_repository::RunRepository;
use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

/// 运行仓库的内存实现
///
/// 运行与任务都按创建顺序保存在向量中，保证任务的分发
/// 顺序可复现。
pub struct InMemoryRunRepository {
    runs: RwLock<Vec<ScrapeRun>>,
    tasks: RwLock<Vec<TargetTask>>,
}

impl InMemoryRunRepository {
    /// 创建新的运行仓库实例
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(Vec::new()),
            tasks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryRunRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn create_run(&self, run: &ScrapeRun) -> Result<ScrapeRun, RepositoryError> {
        self.runs.write().push(run.clone());
        Ok(run.clone())
    }

    async fn find_run_by_id(&self, id: Uuid) -> Result<Option<ScrapeRun>, RepositoryError> {
        Ok(self.runs.read().iter().find(|r| r.id == id).cloned())
    }

    async fn update_run(&self, run: &ScrapeRun) -> Result<ScrapeRun, RepositoryError> {
        let mut runs = self.runs.write();
        let slot = runs
            .iter_mut()
            .find(|r| r.id == run.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = run.clone();
        Ok(run.clone())
    }

    async fn find_runs_by_job(&self, job_id: Uuid) -> Result<Vec<ScrapeRun>, RepositoryError> {
        Ok(self
            .runs
            .read()
            .iter()
            .filter(|r| r.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn latest_run_for_job(
        &self,
        job_id: Uuid,
    ) -> Result<Option<ScrapeRun>, RepositoryError> {
        Ok(self
            .runs
            .read()
            .iter()
            .filter(|r| r.job_id == job_id)
            .last()
            .cloned())
    }

    async fn create_tasks(&self, tasks: &[TargetTask]) -> Result<(), RepositoryError> {
        self.tasks.write().extend_from_slice(tasks);
        Ok(())
    }

    async fn update_task(&self, task: &TargetTask) -> Result<TargetTask, RepositoryError> {
        let mut tasks = self.tasks.write();
        let slot = tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = task.clone();
        Ok(task.clone())
    }

    async fn find_tasks_by_run(&self, run_id: Uuid) -> Result<Vec<TargetTask>, RepositoryError> {
        Ok(self
            .tasks
            .read()
            .iter()
            .filter(|t| t.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        self.runs.write().clear();
        self.tasks.write().clear();
        Ok(())
    }
}
