// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_result::ScrapeResult;
use crate::domain::repositories::job_repository::RepositoryError;
use crate::domain::repositories::result_repository::{OutcomeStats, ResultRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

/// 结果仓库的内存实现
pub struct InMemoryResultRepository {
    results: RwLock<Vec<ScrapeResult>>,
}

impl InMemoryResultRepository {
    /// 创建新的结果仓库实例
    pub fn new() -> Self {
        Self {
            results: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryResultRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultRepository for InMemoryResultRepository {
    async fn append(&self, result: &ScrapeResult) -> Result<ScrapeResult, RepositoryError> {
        self.results.write().push(result.clone());
        Ok(result.clone())
    }

    async fn find_by_run(&self, run_id: Uuid) -> Result<Vec<ScrapeResult>, RepositoryError> {
        Ok(self
            .results
            .read()
            .iter()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn find_recent_by_target(
        &self,
        target_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ScrapeResult>, RepositoryError> {
        Ok(self
            .results
            .read()
            .iter()
            .rev()
            .filter(|r| r.target_id == target_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn stats_since(&self, since: DateTime<Utc>) -> Result<OutcomeStats, RepositoryError> {
        let results = self.results.read();
        let mut stats = OutcomeStats::default();
        for result in results.iter().filter(|r| r.created_at >= since) {
            if result.success {
                stats.succeeded += 1;
            } else {
                stats.failed += 1;
            }
        }
        Ok(stats)
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        self.results.write().clear();
        Ok(())
    }
}
