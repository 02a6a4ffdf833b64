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

use crate::domain::models::job::{JobStatus, ScrapeJob};
use crate::domain::repositories::job_repository::{
    JobQueryParams, JobRepository, RepositoryError,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

/// 作业仓库的内存实现
///
/// 作业按创建顺序保存在进程内的向量中，更新按ID原地替换。
pub struct InMemoryJobRepository {
    jobs: RwLock<Vec<ScrapeJob>>,
}

impl InMemoryJobRepository {
    /// 创建新的作业仓库实例
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryJobRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &ScrapeJob) -> Result<ScrapeJob, RepositoryError> {
        self.jobs.write().push(job.clone());
        Ok(job.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScrapeJob>, RepositoryError> {
        Ok(self.jobs.read().iter().find(|j| j.id == id).cloned())
    }

    async fn update(&self, job: &ScrapeJob) -> Result<ScrapeJob, RepositoryError> {
        let mut jobs = self.jobs.write();
        let slot = jobs
            .iter_mut()
            .find(|j| j.id == job.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = job.clone();
        Ok(job.clone())
    }

    async fn query(&self, params: JobQueryParams) -> Result<Vec<ScrapeJob>, RepositoryError> {
        let jobs = self.jobs.read();
        let filtered = jobs
            .iter()
            .rev() // 创建时间倒序
            .filter(|j| {
                params
                    .statuses
                    .as_ref()
                    .map(|s| s.contains(&j.status))
                    .unwrap_or(true)
            })
            .filter(|j| {
                params
                    .target_id
                    .map(|t| j.target_ids.contains(&t))
                    .unwrap_or(true)
            })
            .skip(params.offset as usize);

        let results: Vec<ScrapeJob> = if params.limit > 0 {
            filtered.take(params.limit as usize).cloned().collect()
        } else {
            filtered.cloned().collect()
        };
        Ok(results)
    }

    async fn find_by_status(&self, status: JobStatus) -> Result<Vec<ScrapeJob>, RepositoryError> {
        Ok(self
            .jobs
            .read()
            .iter()
            .filter(|j| j.status == status)
            .cloned()
            .collect())
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        self.jobs.write().clear();
        Ok(())
    }
}
