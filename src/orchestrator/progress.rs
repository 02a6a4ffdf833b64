// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use serde::Serialize;
use std::time::{Duration, Instant};

/// 进度快照
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    /// 本次运行的目标总数
    pub total: u32,
    /// 待分发的任务数，含等待重试
    pub pending: u32,
    /// 执行中的任务数
    pub in_progress: u32,
    /// 成功完成的任务数
    pub completed: u32,
    /// 失败终止的任务数
    pub failed: u32,
    /// 完成百分比，终止任务占总数的比例
    pub percentage: f64,
    /// 吞吐量（每分钟终止任务数）
    pub throughput_per_min: f64,
    /// 预计剩余秒数，吞吐量为零时未知
    pub eta_seconds: Option<u64>,
}

#[derive(Debug)]
struct Counts {
    pending: u32,
    in_progress: u32,
    completed: u32,
    failed: u32,
}

/// 运行进度跟踪器
///
/// 每次运行一个实例。计数在每个任务状态变化时推送更新，
/// 终止计数只增不减，并发完成乱序到达也不会破坏单调性。
pub struct ProgressTracker {
    total: u32,
    started: Instant,
    counts: Mutex<Counts>,
}

impl ProgressTracker {
    /// 创建跟踪器，所有任务从待分发开始
    pub fn new(total: u32) -> Self {
        Self {
            total,
            started: Instant::now(),
            counts: Mutex::new(Counts {
                pending: total,
                in_progress: 0,
                completed: 0,
                failed: 0,
            }),
        }
    }

    /// 任务进入执行
    pub fn mark_in_progress(&self) {
        let mut counts = self.counts.lock();
        counts.pending = counts.pending.saturating_sub(1);
        counts.in_progress += 1;
    }

    /// 任务退回待分发（等待重试或尝试被中止）
    pub fn mark_requeued(&self) {
        let mut counts = self.counts.lock();
        counts.in_progress = counts.in_progress.saturating_sub(1);
        counts.pending += 1;
    }

    /// 任务成功完成
    pub fn mark_completed(&self) {
        let mut counts = self.counts.lock();
        counts.in_progress = counts.in_progress.saturating_sub(1);
        counts.completed += 1;
    }

    /// 任务失败终止
    pub fn mark_failed(&self) {
        let mut counts = self.counts.lock();
        counts.in_progress = counts.in_progress.saturating_sub(1);
        counts.failed += 1;
    }

    /// 是否所有任务都已终止
    pub fn is_finished(&self) -> bool {
        let counts = self.counts.lock();
        counts.completed + counts.failed >= self.total
    }

    /// 生成当前进度快照
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot_with_elapsed(self.started.elapsed())
    }

    fn snapshot_with_elapsed(&self, elapsed: Duration) -> ProgressSnapshot {
        let counts = self.counts.lock();
        let terminal = counts.completed + counts.failed;
        let remaining = self.total.saturating_sub(terminal);

        let percentage = if self.total == 0 {
            100.0
        } else {
            terminal as f64 / self.total as f64 * 100.0
        };

        let elapsed_secs = elapsed.as_secs_f64();
        let throughput_per_min = if elapsed_secs > 0.0 {
            terminal as f64 / (elapsed_secs / 60.0)
        } else {
            0.0
        };

        let eta_seconds = if remaining == 0 {
            Some(0)
        } else if terminal == 0 || elapsed_secs <= 0.0 {
            None
        } else {
            // 剩余任务数 / 每秒吞吐量
            Some((remaining as f64 * elapsed_secs / terminal as f64).round() as u64)
        };

        ProgressSnapshot {
            total: self.total,
            pending: counts.pending,
            in_progress: counts.in_progress,
            completed: counts.completed,
            failed: counts.failed,
            percentage,
            throughput_per_min,
            eta_seconds,
        }
    }
}
