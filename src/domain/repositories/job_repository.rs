// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{JobStatus, ScrapeJob};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 存储后端错误
    #[error("Storage error: {0}")]
    Storage(String),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 作业查询参数
#[derive(Debug, Default, Clone)]
pub struct JobQueryParams {
    pub statuses: Option<Vec<JobStatus>>,
    pub target_id: Option<Uuid>,
    pub limit: u32,
    pub offset: u32,
}

/// 作业仓库特质
///
/// 定义抓取作业数据访问接口，提供对作业的创建、查询和
/// 状态更新。该特质遵循依赖倒置原则，具体实现由基础设施
/// 层提供。
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// 创建作业
    ///
    /// # 参数
    ///
    /// * `job` - 要创建的作业实体
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapeJob)` - 成功创建后返回作业
    /// * `Err(RepositoryError)` - 创建失败时返回错误
    async fn create(&self, job: &ScrapeJob) -> Result<ScrapeJob, RepositoryError>;

    /// 根据ID查找作业
    ///
    /// # 参数
    ///
    /// * `id` - 作业的唯一标识符
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(ScrapeJob))` - 找到作业时返回作业实体
    /// * `Ok(None)` - 未找到作业时返回空
    /// * `Err(RepositoryError)` - 查询失败时返回错误
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScrapeJob>, RepositoryError>;

    /// 更新作业
    ///
    /// # 参数
    ///
    /// * `job` - 携带新状态的作业实体
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapeJob)` - 更新后的作业
    /// * `Err(RepositoryError::NotFound)` - 作业不存在
    async fn update(&self, job: &ScrapeJob) -> Result<ScrapeJob, RepositoryError>;

    /// 按条件查询作业，按创建时间倒序
    async fn query(&self, params: JobQueryParams) -> Result<Vec<ScrapeJob>, RepositoryError>;

    /// 查找处于指定状态的所有作业
    async fn find_by_status(&self, status: JobStatus) -> Result<Vec<ScrapeJob>, RepositoryError>;

    /// 清空作业记录（硬重置的数据擦除）
    async fn clear(&self) -> Result<(), RepositoryError>;
}
