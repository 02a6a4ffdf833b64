// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::job_repository::RepositoryError;
use crate::domain::models::scrape_result::ScrapeResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 抓取结果统计
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeStats {
    /// 成功的结果数
    pub succeeded: u64,
    /// 失败的结果数
    pub failed: u64,
}

/// 结果仓库特质
///
/// 定义抓取结果的数据访问接口，结果只追加不更新
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// 追加一条抓取结果
    async fn append(&self, result: &ScrapeResult) -> Result<ScrapeResult, RepositoryError>;
    /// 查找运行的所有结果，按创建时间升序
    async fn find_by_run(&self, run_id: Uuid) -> Result<Vec<ScrapeResult>, RepositoryError>;
    /// 查找目标最近的结果，按创建时间倒序
    async fn find_recent_by_target(
        &self,
        target_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ScrapeResult>, RepositoryError>;
    /// 统计指定时间之后的结果
    async fn stats_since(&self, since: DateTime<Utc>) -> Result<OutcomeStats, RepositoryError>;
    /// 清空结果记录（硬重置的数据擦除）
    async fn clear(&self) -> Result<(), RepositoryError>;
}
