// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::engines::traits::FetchEngine;
use crate::orchestrator::manager::EngineManager;

/// 监控配置
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// 检查间隔
    pub interval: Duration,
    /// 触发降级的最大连续探测失败次数
    pub max_consecutive_failures: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_consecutive_failures: 3,
        }
    }
}

/// 引擎监控循环
///
/// 周期性地探测抓取协作方并刷新引擎心跳。连续失败达到
/// 阈值时把引擎标记为降级并挂起分发，探测恢复后立即解除。
pub struct EngineMonitor {
    manager: Arc<EngineManager>,
    fetcher: Arc<dyn FetchEngine>,
    config: MonitorConfig,
}

impl EngineMonitor {
    /// 创建监控循环
    pub fn new(manager: Arc<EngineManager>, fetcher: Arc<dyn FetchEngine>) -> Self {
        Self {
            manager,
            fetcher,
            config: MonitorConfig::default(),
        }
    }

    /// 使用自定义配置创建监控循环
    pub fn new_with_config(
        manager: Arc<EngineManager>,
        fetcher: Arc<dyn FetchEngine>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            manager,
            fetcher,
            config,
        }
    }

    /// 派生后台任务，取消令牌触发时退出
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval);
            let mut consecutive_failures = 0u32;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        self.perform_check(&mut consecutive_failures).await;
                    }
                }
            }
            debug!("Engine monitor stopped");
        })
    }

    /// 执行一轮检查：协作方探测加引擎心跳
    ///
    /// # 参数
    ///
    /// * `consecutive_failures` - 跨轮次累计的连续失败计数
    pub async fn perform_check(&self, consecutive_failures: &mut u32) {
        match self.fetcher.probe().await {
            Ok(()) => {
                if *consecutive_failures > 0 {
                    debug!(
                        engine = self.fetcher.name(),
                        "Fetch collaborator probe recovered"
                    );
                }
                *consecutive_failures = 0;
                self.manager.mark_recovered();
            }
            Err(e) => {
                *consecutive_failures += 1;
                warn!(
                    engine = self.fetcher.name(),
                    consecutive = *consecutive_failures,
                    error = %e,
                    "Fetch collaborator probe failed"
                );
                if *consecutive_failures >= self.config.max_consecutive_failures {
                    self.manager.mark_degraded(&e.to_string());
                }
            }
        }

        if let Err(e) = self.manager.heartbeat().await {
            error!(error = %e, "Heartbeat update failed");
        }
    }
}
