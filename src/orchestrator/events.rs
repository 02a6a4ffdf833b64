// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

/// 引擎事件
///
/// 编排器在作业生命周期的每个阶段发布的事件，序列化后
/// 供日志流和仪表盘消费。
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// 作业已创建
    JobCreated { job_id: Uuid, target_count: u32 },
    /// 作业已开始执行
    JobStarted { job_id: Uuid, run_id: Uuid },
    /// 作业已暂停
    JobPaused { job_id: Uuid },
    /// 作业已恢复
    JobResumed { job_id: Uuid, run_id: Uuid },
    /// 作业已完成
    JobCompleted {
        job_id: Uuid,
        completed_targets: u32,
        failed_targets: u32,
    },
    /// 作业已失败
    JobFailed { job_id: Uuid, failed_targets: u32 },
    /// 作业已取消
    JobCancelled { job_id: Uuid },
    /// 单目标抓取已开始
    TargetStarted {
        job_id: Uuid,
        run_id: Uuid,
        target_id: Uuid,
        attempt: u32,
    },
    /// 单目标抓取已完成
    TargetCompleted {
        job_id: Uuid,
        run_id: Uuid,
        target_id: Uuid,
        extracted_count: u32,
        response_time_ms: u64,
    },
    /// 单目标抓取已失败终止
    TargetFailed {
        job_id: Uuid,
        run_id: Uuid,
        target_id: Uuid,
        error: String,
    },
    /// 进度更新
    ProgressUpdate {
        job_id: Uuid,
        run_id: Uuid,
        completed: u32,
        failed: u32,
        total: u32,
        percentage: f64,
        eta_seconds: Option<u64>,
    },
    /// 引擎进入降级状态
    EngineDegraded { reason: String },
    /// 引擎从降级恢复
    EngineRecovered,
}

/// 带时间戳的事件信封
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// 事件发布时间
    pub timestamp: DateTime<Utc>,
    /// 事件内容
    #[serde(flatten)]
    pub event: EngineEvent,
}

/// 事件订阅者特质
///
/// 订阅者同步接收事件。返回错误只会被记录，不会中断
/// 编排，也不影响其他订阅者。
pub trait EventSubscriber: Send + Sync {
    /// 订阅者名称，用于错误日志
    fn name(&self) -> &'static str;
    /// 处理一个事件
    fn on_event(&self, event: &EventEnvelope) -> anyhow::Result<()>;
}

/// 事件总线
///
/// 同步扇出：publish在调用线程上依次通知所有订阅者
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventBus {
    /// 创建一个空的事件总线
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册订阅者
    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// 发布事件
    ///
    /// 订阅者按注册顺序收到事件，单个订阅者的错误被记录
    /// 后继续通知下一个
    pub fn publish(&self, event: EngineEvent) {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        for subscriber in &self.subscribers {
            if let Err(e) = subscriber.on_event(&envelope) {
                warn!(
                    subscriber = subscriber.name(),
                    error = %e,
                    "Event subscriber failed"
                );
            }
        }
    }
}

/// 日志订阅者
///
/// 将事件写入tracing日志
pub struct LogSubscriber;

impl EventSubscriber for LogSubscriber {
    fn name(&self) -> &'static str {
        "log"
    }

    fn on_event(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        match &envelope.event {
            EngineEvent::JobCreated {
                job_id,
                target_count,
            } => {
                info!(job_id = %job_id, targets = target_count, "Job created");
            }
            EngineEvent::JobStarted { job_id, run_id } => {
                info!(job_id = %job_id, run_id = %run_id, "Job started");
            }
            EngineEvent::JobPaused { job_id } => {
                info!(job_id = %job_id, "Job paused");
            }
            EngineEvent::JobResumed { job_id, run_id } => {
                info!(job_id = %job_id, run_id = %run_id, "Job resumed");
            }
            EngineEvent::JobCompleted {
                job_id,
                completed_targets,
                failed_targets,
            } => {
                info!(
                    job_id = %job_id,
                    completed = completed_targets,
                    failed = failed_targets,
                    "Job completed"
                );
            }
            EngineEvent::JobFailed {
                job_id,
                failed_targets,
            } => {
                warn!(job_id = %job_id, failed = failed_targets, "Job failed");
            }
            EngineEvent::JobCancelled { job_id } => {
                info!(job_id = %job_id, "Job cancelled");
            }
            EngineEvent::TargetStarted {
                target_id, attempt, ..
            } => {
                info!(target_id = %target_id, attempt = attempt, "Target fetch started");
            }
            EngineEvent::TargetCompleted {
                target_id,
                extracted_count,
                response_time_ms,
                ..
            } => {
                info!(
                    target_id = %target_id,
                    extracted = extracted_count,
                    elapsed_ms = response_time_ms,
                    "Target fetch completed"
                );
            }
            EngineEvent::TargetFailed {
                target_id, error, ..
            } => {
                warn!(target_id = %target_id, error = %error, "Target fetch failed");
            }
            EngineEvent::ProgressUpdate {
                job_id, percentage, ..
            } => {
                info!(job_id = %job_id, percentage = format!("{:.1}", percentage), "Progress update");
            }
            EngineEvent::EngineDegraded { reason } => {
                warn!(reason = %reason, "Engine degraded");
            }
            EngineEvent::EngineRecovered => {
                info!("Engine recovered");
            }
        }
        Ok(())
    }
}

/// 近期事件环形缓冲订阅者
///
/// 为仪表盘保留最近的事件，超出容量丢弃最旧的
pub struct RingBufferSubscriber {
    capacity: usize,
    buffer: Mutex<VecDeque<EventEnvelope>>,
}

impl RingBufferSubscriber {
    /// 创建指定容量的环形缓冲
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// 读取缓冲中的事件，从旧到新
    pub fn recent(&self) -> Vec<EventEnvelope> {
        self.buffer.lock().iter().cloned().collect()
    }
}

impl EventSubscriber for RingBufferSubscriber {
    fn name(&self) -> &'static str {
        "ring_buffer"
    }

    fn on_event(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        let mut buffer = self.buffer.lock();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(envelope.clone());
        Ok(())
    }
}

/// 广播转发订阅者
///
/// 将事件转发到tokio广播通道，供SSE日志流消费。没有
/// 接收者时发送失败是正常情况。
pub struct BroadcastSubscriber {
    tx: broadcast::Sender<EventEnvelope>,
}

impl BroadcastSubscriber {
    /// 创建指定通道容量的广播订阅者
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// 获取一个接收端
    pub fn receiver(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }
}

impl EventSubscriber for BroadcastSubscriber {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn on_event(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        // 没有活跃接收者时send返回错误，不视为失败
        let _ = self.tx.send(envelope.clone());
        Ok(())
    }
}

/// 指标订阅者
///
/// 将事件翻译为Prometheus计数器和直方图
pub struct MetricsSubscriber;

impl EventSubscriber for MetricsSubscriber {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn on_event(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        match &envelope.event {
            EngineEvent::JobStarted { .. } => {
                counter!("scrape_jobs_started_total").increment(1);
            }
            EngineEvent::TargetCompleted {
                response_time_ms, ..
            } => {
                counter!("target_tasks_completed_total").increment(1);
                histogram!("target_fetch_duration_seconds")
                    .record(*response_time_ms as f64 / 1000.0);
            }
            EngineEvent::TargetFailed { .. } => {
                counter!("target_tasks_failed_total").increment(1);
            }
            _ => {}
        }
        Ok(())
    }
}
