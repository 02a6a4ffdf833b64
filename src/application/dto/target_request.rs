// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::models::target::{FetchMode, TargetConfig};

/// 目标注册请求DTO
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateTargetRequestDto {
    /// 目标名称
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    /// 抓取方式，默认structured_feed
    pub fetch_mode: Option<FetchMode>,

    /// 入口地址
    #[validate(url)]
    pub endpoint: String,

    /// 选择器规则
    pub selector_rules: Option<serde_json::Value>,

    /// 附加请求头
    pub headers: Option<serde_json::Value>,

    /// 请求最小间隔（毫秒）
    #[validate(range(min = 0, max = 300000))]
    pub rate_limit_delay_ms: Option<u64>,

    /// 最大页数
    #[validate(range(min = 1, max = 1000))]
    pub max_pages: Option<u32>,

    /// 最大重试次数
    #[validate(range(min = 0, max = 10))]
    pub max_retries: Option<u32>,

    /// 是否参与调度，默认true
    pub active: Option<bool>,
}

impl CreateTargetRequestDto {
    /// 转换为领域模型
    pub fn into_config(self) -> TargetConfig {
        let mut target = TargetConfig::new(
            self.name,
            self.fetch_mode.unwrap_or_default(),
            self.endpoint,
        );
        if let Some(rules) = self.selector_rules {
            target.selector_rules = rules;
        }
        target.headers = self.headers;
        if let Some(delay) = self.rate_limit_delay_ms {
            target.rate_limit_delay_ms = delay;
        }
        if let Some(pages) = self.max_pages {
            target.max_pages = pages;
        }
        if let Some(retries) = self.max_retries {
            target.max_retries = retries;
        }
        if let Some(active) = self.active {
            target.active = active;
        }
        target
    }
}

/// 目标更新请求DTO
///
/// 所有字段可选，只修改给出的字段。变更只影响之后启动的
/// 作业，运行中的快照不受影响。
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct UpdateTargetRequestDto {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    pub fetch_mode: Option<FetchMode>,

    #[validate(url)]
    pub endpoint: Option<String>,

    pub selector_rules: Option<serde_json::Value>,

    pub headers: Option<serde_json::Value>,

    #[validate(range(min = 0, max = 300000))]
    pub rate_limit_delay_ms: Option<u64>,

    #[validate(range(min = 1, max = 1000))]
    pub max_pages: Option<u32>,

    #[validate(range(min = 0, max = 10))]
    pub max_retries: Option<u32>,

    pub active: Option<bool>,
}

impl UpdateTargetRequestDto {
    /// 把非空字段套用到既有配置上
    pub fn apply_to(self, mut target: TargetConfig) -> TargetConfig {
        if let Some(name) = self.name {
            target.name = name;
        }
        if let Some(mode) = self.fetch_mode {
            target.fetch_mode = mode;
        }
        if let Some(endpoint) = self.endpoint {
            target.endpoint = endpoint;
        }
        if let Some(rules) = self.selector_rules {
            target.selector_rules = rules;
        }
        if let Some(headers) = self.headers {
            target.headers = Some(headers);
        }
        if let Some(delay) = self.rate_limit_delay_ms {
            target.rate_limit_delay_ms = delay;
        }
        if let Some(pages) = self.max_pages {
            target.max_pages = pages;
        }
        if let Some(retries) = self.max_retries {
            target.max_retries = retries;
        }
        if let Some(active) = self.active {
            target.active = active;
        }
        target
    }
}

/// 目标列表查询DTO
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TargetListQueryDto {
    /// 为true时连同未激活目标一起返回
    pub include_inactive: Option<bool>,
}
