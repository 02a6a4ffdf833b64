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

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::models::scrape_result::FailureKind;
use crate::domain::models::target::TargetSnapshot;

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum FetchError {
    /// 请求失败（网络层）
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 目标限流
    #[error("Rate limited by target")]
    RateLimited,
    /// 目标拒绝（客户端错误）
    #[error("Rejected by target: status {status}")]
    Rejected {
        /// HTTP状态码
        status: u16,
    },
    /// 上游服务错误
    #[error("Upstream failure: status {status}")]
    Upstream {
        /// HTTP状态码
        status: u16,
    },
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 抓取被取消
    #[error("Fetch cancelled")]
    Cancelled,
    /// 目标配置无效
    #[error("Invalid target configuration: {0}")]
    InvalidConfig(String),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl FetchError {
    /// 将错误归类为失败类型
    ///
    /// 重试策略只根据失败类型决策，不关心具体错误
    ///
    /// # 返回值
    ///
    /// * `FailureKind::Transient` - 网络层错误、超时、上游5xx
    /// * `FailureKind::RateLimited` - 目标返回429
    /// * `FailureKind::Permanent` - 客户端错误、配置无效
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::RequestFailed(e) => {
                if e.is_timeout() || e.is_connect() {
                    FailureKind::Transient
                } else if e.status().is_some_and(|s| s.as_u16() == 429) {
                    FailureKind::RateLimited
                } else if e.status().is_some_and(|s| s.is_server_error()) {
                    FailureKind::Transient
                } else if e.status().is_some_and(|s| s.is_client_error()) {
                    FailureKind::Permanent
                } else {
                    FailureKind::Transient
                }
            }
            FetchError::RateLimited => FailureKind::RateLimited,
            FetchError::Rejected { .. } => FailureKind::Permanent,
            FetchError::Upstream { .. } => FailureKind::Transient,
            FetchError::Timeout => FailureKind::Transient,
            // 取消不是失败，执行器单独处理，这里保守归为瞬时
            FetchError::Cancelled => FailureKind::Transient,
            FetchError::InvalidConfig(_) => FailureKind::Permanent,
            FetchError::Other(_) => FailureKind::Permanent,
        }
    }
}

/// 一次成功抓取的产出
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// HTTP响应状态码
    pub status_code: u16,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
    /// 提取到的职位条目数
    pub extracted_count: u32,
}

/// 抓取引擎特质
///
/// 抓取与解析由协作方服务完成，引擎只负责编排。
/// 该特质是编排器与协作方之间的唯一接口。
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// 对单个目标执行一次抓取
    ///
    /// # 参数
    ///
    /// * `snapshot` - 目标配置快照
    /// * `cancel` - 取消令牌，支持取消的实现应在令牌触发时中止
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchOutcome)` - 抓取成功
    /// * `Err(FetchError)` - 抓取失败，错误携带失败类型
    async fn fetch(
        &self,
        snapshot: &TargetSnapshot,
        cancel: CancellationToken,
    ) -> Result<FetchOutcome, FetchError>;

    /// 健康探测
    ///
    /// 监控循环定期调用，失败会使引擎进入降级状态
    async fn probe(&self) -> Result<(), FetchError>;

    /// 是否支持中途取消
    ///
    /// 不支持取消的实现只保证不再接收新任务，进行中的
    /// 抓取会执行到结束
    fn cancellable(&self) -> bool {
        false
    }

    /// 引擎名称
    fn name(&self) -> &'static str;
}
