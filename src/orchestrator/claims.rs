// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

/// 目标独占认领表
///
/// 保证同一目标同时最多被一个未终止的作业持有。认领在
/// 作业启动时整体获取，作业终止或硬重置时释放；暂停的
/// 作业继续持有认领。
#[derive(Debug, Default)]
pub struct TargetClaims {
    /// 目标ID到持有作业ID的映射
    claims: Mutex<HashMap<Uuid, Uuid>>,
}

impl TargetClaims {
    /// 创建一个新的认领表
    pub fn new() -> Self {
        Self::default()
    }

    /// 为作业整体认领一组目标
    ///
    /// 全有或全无：任意一个目标已被其他作业持有时整个认领
    /// 失败，且不留下部分认领。
    ///
    /// # 参数
    ///
    /// * `target_ids` - 要认领的目标ID列表
    /// * `job_id` - 发起认领的作业ID
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 认领成功
    /// * `Err(Uuid)` - 按输入顺序第一个已被占用的目标ID
    pub fn claim_all(&self, target_ids: &[Uuid], job_id: Uuid) -> Result<(), Uuid> {
        let mut claims = self.claims.lock();

        // 先检查后写入，持锁期间保证原子性
        for target_id in target_ids {
            if let Some(holder) = claims.get(target_id) {
                if *holder != job_id {
                    return Err(*target_id);
                }
            }
        }
        for target_id in target_ids {
            claims.insert(*target_id, job_id);
        }
        Ok(())
    }

    /// 释放作业持有的全部认领
    ///
    /// # 返回值
    ///
    /// 释放的认领数
    pub fn release_job(&self, job_id: Uuid) -> usize {
        let mut claims = self.claims.lock();
        let before = claims.len();
        claims.retain(|_, holder| *holder != job_id);
        before - claims.len()
    }

    /// 查询目标当前的持有作业
    pub fn holder(&self, target_id: Uuid) -> Option<Uuid> {
        self.claims.lock().get(&target_id).copied()
    }

    /// 判断目标是否已被认领
    pub fn is_claimed(&self, target_id: Uuid) -> bool {
        self.claims.lock().contains_key(&target_id)
    }

    /// 清空认领表（硬重置）
    pub fn clear(&self) {
        self.claims.lock().clear();
    }
}
