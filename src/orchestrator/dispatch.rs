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

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use uuid::Uuid;

/// 目标节流器
///
/// 引擎级共享，记录每个目标下一次允许分发的时刻，保证
/// 同一目标的两次分发之间至少间隔其配置的最小延迟，跨
/// 作业跨运行生效。
#[derive(Debug, Default)]
pub struct TargetPacer {
    slots: DashMap<Uuid, Instant>,
}

impl TargetPacer {
    /// 创建一个新的节流器
    pub fn new() -> Self {
        Self::default()
    }

    /// 只读检查目标当前是否允许分发
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 允许分发
    /// * `Err(Instant)` - 最早允许分发的时刻
    pub fn check(&self, target_id: Uuid) -> Result<(), Instant> {
        match self.slots.get(&target_id) {
            Some(allowed_at) if Instant::now() < *allowed_at => Err(*allowed_at),
            _ => Ok(()),
        }
    }

    /// 原子地检查并预约一次分发
    ///
    /// 成功时写入下一次允许分发的时刻。间隔为零的目标不
    /// 参与节流。
    ///
    /// # 参数
    ///
    /// * `target_id` - 目标ID
    /// * `spacing` - 该目标两次分发的最小间隔
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 预约成功，可以分发
    /// * `Err(Instant)` - 尚未到允许时刻
    pub fn try_reserve(&self, target_id: Uuid, spacing: Duration) -> Result<(), Instant> {
        if spacing.is_zero() {
            return Ok(());
        }

        let now = Instant::now();
        match self.slots.entry(target_id) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let allowed_at = *entry.get();
                if now < allowed_at {
                    Err(allowed_at)
                } else {
                    entry.insert(now + spacing);
                    Ok(())
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(now + spacing);
                Ok(())
            }
        }
    }

    /// 清空节流记录（硬重置）
    pub fn clear(&self) {
        self.slots.clear();
    }
}

/// 分发闸门
///
/// 每次运行一个实例，并发上限在运行启动时从运行时配置
/// 捕获。全局信号量约束同时执行的目标任务数；挂起标志
/// 由监控在协作方不可达时抬起，新的许可获取会等待恢复。
#[derive(Clone)]
pub struct DispatchGate {
    semaphore: Arc<Semaphore>,
    pacer: Arc<TargetPacer>,
    suspended: watch::Receiver<bool>,
}

impl DispatchGate {
    /// 创建分发闸门
    ///
    /// # 参数
    ///
    /// * `max_concurrent` - 同时执行的目标任务上限
    /// * `pacer` - 引擎级共享的目标节流器
    /// * `suspended` - 分发挂起标志的接收端
    pub fn new(
        max_concurrent: usize,
        pacer: Arc<TargetPacer>,
        suspended: watch::Receiver<bool>,
    ) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            pacer,
            suspended,
        }
    }

    /// 获取一个分发许可
    ///
    /// 分发挂起期间等待恢复。许可随任务结束释放。
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        let mut suspended = self.suspended.clone();
        loop {
            if !*suspended.borrow_and_update() {
                break;
            }
            if suspended.changed().await.is_err() {
                break;
            }
        }
        // 信号量从不关闭
        self.semaphore.clone().acquire_owned().await.unwrap()
    }

    /// 访问共享的目标节流器
    pub fn pacer(&self) -> &TargetPacer {
        &self.pacer
    }

    /// 分发当前是否被挂起
    pub fn is_suspended(&self) -> bool {
        *self.suspended.borrow()
    }

    /// 当前可用的许可数
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
