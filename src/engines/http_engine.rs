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
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::models::target::TargetSnapshot;
use crate::engines::traits::{FetchEngine, FetchError, FetchOutcome};

/// 抓取协作方响应体
#[derive(Debug, Deserialize)]
struct FetchResponseBody {
    /// 目标站点返回的HTTP状态码
    #[serde(default)]
    status_code: Option<u16>,
    /// 协作方测得的响应时间（毫秒）
    #[serde(default)]
    response_time_ms: Option<u64>,
    /// 提取到的职位条目数
    #[serde(default)]
    extracted_count: u32,
}

/// HTTP抓取引擎
///
/// 通过HTTP调用抓取与解析协作方服务的适配器。协作方负责
/// 实际的请求发送、反爬对抗和选择器应用，本引擎只转发
/// 目标快照并归类结果。
pub struct HttpFetchEngine {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetchEngine {
    /// 创建新的HTTP抓取引擎
    ///
    /// # 参数
    ///
    /// * `base_url` - 协作方服务地址
    /// * `timeout` - 单次抓取请求的超时时间
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("harvestrs/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn send_fetch(&self, snapshot: &TargetSnapshot) -> Result<FetchOutcome, FetchError> {
        let url = format!("{}/v1/fetch", self.base_url);
        let started = Instant::now();

        let response = self.client.post(&url).json(snapshot).send().await?;
        let status = response.status();

        if status.is_success() {
            let body: FetchResponseBody = response.json().await?;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            debug!(
                target_id = %snapshot.target_id,
                extracted = body.extracted_count,
                "fetch succeeded"
            );
            return Ok(FetchOutcome {
                status_code: body.status_code.unwrap_or(status.as_u16()),
                response_time_ms: body.response_time_ms.unwrap_or(elapsed_ms),
                extracted_count: body.extracted_count,
            });
        }

        match status.as_u16() {
            429 => Err(FetchError::RateLimited),
            code if status.is_client_error() => Err(FetchError::Rejected { status: code }),
            code => Err(FetchError::Upstream { status: code }),
        }
    }
}

#[async_trait]
impl FetchEngine for HttpFetchEngine {
    /// 执行一次抓取
    ///
    /// 转发目标快照到协作方，取消令牌触发时中止等待
    ///
    /// # 参数
    ///
    /// * `snapshot` - 目标配置快照
    /// * `cancel` - 取消令牌
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchOutcome)` - 抓取成功
    /// * `Err(FetchError)` - 抓取失败或被取消
    async fn fetch(
        &self,
        snapshot: &TargetSnapshot,
        cancel: CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.send_fetch(snapshot) => result,
        }
    }

    /// 健康探测
    ///
    /// 请求协作方的健康端点，非2xx视为不可达
    async fn probe(&self) -> Result<(), FetchError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(FetchError::Upstream {
                status: response.status().as_u16(),
            })
        }
    }

    fn cancellable(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "http_fetcher"
    }
}
