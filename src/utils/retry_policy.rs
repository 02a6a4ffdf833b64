// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::domain::models::scrape_result::FailureKind;

/// 重试决策
///
/// 针对一次失败的抓取尝试，由策略给出的处理决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// 在指定延迟后重试
    RetryAfter(Duration),
    /// 放弃，任务转为永久失败
    GiveUp,
}

/// 重试策略配置
///
/// 纯决策函数：输入已尝试次数、重试预算和失败类型，输出重试或放弃。
/// 策略本身不持有任何任务状态。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 初始退避时间
    pub initial_backoff: Duration,
    /// 最大退避时间
    pub max_backoff: Duration,
    /// 退避乘数
    pub backoff_multiplier: f64,
    /// 抖动因子 (0.0-1.0)
    pub jitter_factor: f64,
    /// 是否启用抖动
    pub enable_jitter: bool,
    /// 限流失败的初始重试延迟
    pub rate_limit_initial_delay: Duration,
    /// 限流重试延迟的硬上限，翻倍超过该值后放弃
    pub rate_limit_delay_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            enable_jitter: true,
            rate_limit_initial_delay: Duration::from_secs(5),
            rate_limit_delay_cap: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// 创建标准重试策略
    pub fn standard() -> Self {
        Self::default()
    }

    /// 创建快速重试策略（更短的退避时间，适合测试环境）
    pub fn fast() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 1.5,
            jitter_factor: 0.1,
            enable_jitter: false,
            rate_limit_initial_delay: Duration::from_millis(200),
            rate_limit_delay_cap: Duration::from_secs(10),
        }
    }

    /// 针对一次失败给出重试决策
    ///
    /// # 参数
    ///
    /// * `attempt_count` - 已执行的抓取尝试次数（含刚刚失败的这次）
    /// * `max_retries` - 该任务允许的最大重试次数
    /// * `kind` - 失败类型
    ///
    /// # 返回值
    ///
    /// * `RetryDecision::RetryAfter(delay)` - 在延迟后重试
    /// * `RetryDecision::GiveUp` - 任务永久失败
    ///
    /// 不变式：瞬时失败的总尝试次数不超过 `max_retries + 1`；
    /// 永久失败从不重试；限流失败不消耗重试预算，延迟按次翻倍，
    /// 超过硬上限后放弃。
    pub fn decide(&self, attempt_count: u32, max_retries: u32, kind: FailureKind) -> RetryDecision {
        match kind {
            FailureKind::Permanent => RetryDecision::GiveUp,
            FailureKind::Transient => {
                if attempt_count <= max_retries {
                    RetryDecision::RetryAfter(self.calculate_backoff(attempt_count))
                } else {
                    RetryDecision::GiveUp
                }
            }
            FailureKind::RateLimited => {
                let delay = self.rate_limit_delay(attempt_count);
                if delay <= self.rate_limit_delay_cap {
                    RetryDecision::RetryAfter(delay)
                } else {
                    RetryDecision::GiveUp
                }
            }
        }
    }

    /// 计算下次重试的退避时间
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        // 计算指数退避
        let backoff_secs =
            self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32 - 1);

        // 限制最大退避时间
        let capped_backoff = backoff_secs.min(self.max_backoff.as_secs_f64());

        // 添加抖动
        let final_backoff = if self.enable_jitter {
            let jitter_range = capped_backoff * self.jitter_factor;
            let jitter = rand::random_range(-jitter_range..jitter_range);
            (capped_backoff + jitter).max(0.0)
        } else {
            capped_backoff
        };

        Duration::from_secs_f64(final_backoff)
    }

    /// 计算限流重试延迟，从初始值起按尝试次数翻倍，不截断
    fn rate_limit_delay(&self, attempt: u32) -> Duration {
        self.rate_limit_initial_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// 计算下次重试时间
    pub fn next_retry_time(&self, attempt: u32, base_time: DateTime<Utc>) -> DateTime<Utc> {
        let backoff = self.calculate_backoff(attempt);
        base_time + chrono::Duration::milliseconds(backoff.as_millis() as i64)
    }
}
