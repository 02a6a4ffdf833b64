// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::target::TargetConfig;
use crate::domain::repositories::job_repository::RepositoryError;
use crate::domain::repositories::target_repository::TargetRepository;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// 目标仓库的内存实现
///
/// 默认装配使用的存储，目标配置保存在进程内。
pub struct InMemoryTargetRepository {
    targets: RwLock<HashMap<Uuid, TargetConfig>>,
}

impl InMemoryTargetRepository {
    /// 创建新的目标仓库实例
    pub fn new() -> Self {
        Self {
            targets: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryTargetRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetRepository for InMemoryTargetRepository {
    async fn create(&self, target: &TargetConfig) -> Result<TargetConfig, RepositoryError> {
        self.targets.write().insert(target.id, target.clone());
        Ok(target.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TargetConfig>, RepositoryError> {
        Ok(self.targets.read().get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<TargetConfig>, RepositoryError> {
        let targets = self.targets.read();
        Ok(ids.iter().filter_map(|id| targets.get(id).cloned()).collect())
    }

    async fn list(&self, include_inactive: bool) -> Result<Vec<TargetConfig>, RepositoryError> {
        let mut targets: Vec<TargetConfig> = self
            .targets
            .read()
            .values()
            .filter(|t| include_inactive || t.active)
            .cloned()
            .collect();
        targets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(targets)
    }

    async fn update(&self, target: &TargetConfig) -> Result<TargetConfig, RepositoryError> {
        let mut targets = self.targets.write();
        if !targets.contains_key(&target.id) {
            return Err(RepositoryError::NotFound);
        }
        targets.insert(target.id, target.clone());
        Ok(target.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.targets
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn record_outcome(&self, id: Uuid, success: bool) -> Result<(), RepositoryError> {
        let mut targets = self.targets.write();
        let target = targets.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        target.record_outcome(success);
        Ok(())
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        self.targets.write().clear();
        Ok(())
    }
}
