// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::job_repository::RepositoryError;
use crate::domain::models::target::TargetConfig;
use async_trait::async_trait;
use uuid::Uuid;

/// 目标配置仓库特质
///
/// 定义目标站点配置的数据访问接口。配置由运营人员通过
/// 注册表API维护，引擎侧只读取和回写滚动成功率。
#[async_trait]
pub trait TargetRepository: Send + Sync {
    /// 创建目标配置
    async fn create(&self, target: &TargetConfig) -> Result<TargetConfig, RepositoryError>;

    /// 根据ID查找目标配置
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TargetConfig>, RepositoryError>;

    /// 批量查找目标配置，保持输入顺序
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<TargetConfig>)` - 找到的配置，缺失的ID被跳过
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<TargetConfig>, RepositoryError>;

    /// 列出目标配置
    ///
    /// # 参数
    ///
    /// * `include_inactive` - 是否包含已停用的目标
    async fn list(&self, include_inactive: bool) -> Result<Vec<TargetConfig>, RepositoryError>;

    /// 更新目标配置
    async fn update(&self, target: &TargetConfig) -> Result<TargetConfig, RepositoryError>;

    /// 删除目标配置
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// 回写一次抓取结果，更新滚动成功率
    async fn record_outcome(&self, id: Uuid, success: bool) -> Result<(), RepositoryError>;

    /// 清空目标注册表（硬重置的配置擦除）
    async fn clear(&self) -> Result<(), RepositoryError>;
}
