// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::models::scrape_result::ScrapeResult;

/// 选择器优化建议
///
/// 优化服务针对单个目标给出的配置调整建议。建议仅供参考，
/// 引擎只记录和展示，从不自动应用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDelta {
    /// 建议的新选择器规则
    pub selector_rules: Option<serde_json::Value>,
    /// 建议的请求间隔（毫秒）
    pub rate_limit_delay_ms: Option<u64>,
    /// 建议说明
    pub note: Option<String>,
}

/// 选择器优化服务特质
///
/// 咨询式接口：输入目标最近的抓取结果，输出可选的配置
/// 调整建议。服务不可用从不阻塞编排。
#[async_trait]
pub trait SelectorOptimizer: Send + Sync {
    /// 请求优化建议
    ///
    /// # 参数
    ///
    /// * `target_id` - 目标ID
    /// * `recent` - 该目标最近的抓取结果
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(ConfigDelta))` - 服务给出了建议
    /// * `Ok(None)` - 无建议
    /// * `Err` - 服务调用失败
    async fn suggest(
        &self,
        target_id: Uuid,
        recent: &[ScrapeResult],
    ) -> Result<Option<ConfigDelta>>;
}

/// 优化服务的HTTP客户端
pub struct HttpSelectorOptimizer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSelectorOptimizer {
    /// 创建新的优化服务客户端
    ///
    /// # 参数
    ///
    /// * `base_url` - 优化服务地址
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SelectorOptimizer for HttpSelectorOptimizer {
    async fn suggest(
        &self,
        target_id: Uuid,
        recent: &[ScrapeResult],
    ) -> Result<Option<ConfigDelta>> {
        let url = format!("{}/v1/suggest", self.base_url);
        let body = json!({
            "target_id": target_id,
            "results": recent,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("optimizer request failed")?;

        // 204 表示服务没有建议
        if response.status().as_u16() == 204 {
            return Ok(None);
        }
        if !response.status().is_success() {
            bail!("optimizer returned status {}", response.status());
        }

        let delta: ConfigDelta = response
            .json()
            .await
            .context("invalid optimizer response body")?;
        Ok(Some(delta))
    }
}
