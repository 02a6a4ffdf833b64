// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 滚动成功率的指数加权平均系数
const SUCCESS_RATE_ALPHA: f64 = 0.2;

/// 目标站点配置实体
///
/// 表示一个可抓取的招聘站点及其抓取参数，包括抓取方式、
/// 选择器规则、限速与重试预算。配置由运营人员维护，
/// 引擎在任务分发时只读取并快照其中的值。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// 目标唯一标识符
    pub id: Uuid,
    /// 目标名称，用于用户识别和管理
    pub name: String,
    /// 抓取方式，决定使用结构化源还是页面解析
    pub fetch_mode: FetchMode,
    /// 入口地址，抓取的起始URL
    pub endpoint: String,
    /// 选择器规则，JSON格式，引擎不解释其内容
    pub selector_rules: serde_json::Value,
    /// 附加请求头（可选）
    pub headers: Option<serde_json::Value>,
    /// 同一目标两次请求之间的最小间隔（毫秒）
    pub rate_limit_delay_ms: u64,
    /// 单次任务最多抓取的页数
    pub max_pages: u32,
    /// 单个任务允许的最大重试次数
    pub max_retries: u32,
    /// 是否启用，停用的目标不会被新任务选中
    pub active: bool,
    /// 滚动成功率，根据历史抓取结果持续更新
    pub success_rate: f64,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 抓取方式枚举
///
/// 结构化源（RSS/API）直接解析数据，页面抓取需要应用选择器规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// 结构化数据源（RSS、Atom或JSON API）
    #[default]
    StructuredFeed,
    /// HTML页面抓取，应用选择器规则提取内容
    PageScrape,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FetchMode::StructuredFeed => write!(f, "structured_feed"),
            FetchMode::PageScrape => write!(f, "page_scrape"),
        }
    }
}

impl FromStr for FetchMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "structured_feed" => Ok(FetchMode::StructuredFeed),
            "page_scrape" => Ok(FetchMode::PageScrape),
            _ => Err(()),
        }
    }
}

/// 目标配置快照
///
/// 任务启动时从TargetConfig复制的不可变副本，保证一次运行
/// 期间抓取参数不随配置编辑而变化。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSnapshot {
    /// 来源目标ID
    pub target_id: Uuid,
    /// 目标名称
    pub name: String,
    /// 抓取方式
    pub fetch_mode: FetchMode,
    /// 入口地址
    pub endpoint: String,
    /// 选择器规则
    pub selector_rules: serde_json::Value,
    /// 附加请求头
    pub headers: Option<serde_json::Value>,
    /// 请求最小间隔（毫秒）
    pub rate_limit_delay_ms: u64,
    /// 最大页数
    pub max_pages: u32,
    /// 最大重试次数
    pub max_retries: u32,
}

impl TargetConfig {
    /// 创建一个新的目标配置
    ///
    /// # 参数
    ///
    /// * `name` - 目标名称
    /// * `fetch_mode` - 抓取方式
    /// * `endpoint` - 入口地址
    ///
    /// # 返回值
    ///
    /// 返回新创建的目标配置，默认启用，成功率初始为1.0
    pub fn new(name: String, fetch_mode: FetchMode, endpoint: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            fetch_mode,
            endpoint,
            selector_rules: serde_json::Value::Null,
            headers: None,
            rate_limit_delay_ms: 0,
            max_pages: 1,
            max_retries: 3,
            active: true,
            success_rate: 1.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 生成当前配置的不可变快照
    pub fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot {
            target_id: self.id,
            name: self.name.clone(),
            fetch_mode: self.fetch_mode,
            endpoint: self.endpoint.clone(),
            selector_rules: self.selector_rules.clone(),
            headers: self.headers.clone(),
            rate_limit_delay_ms: self.rate_limit_delay_ms,
            max_pages: self.max_pages,
            max_retries: self.max_retries,
        }
    }

    /// 根据一次抓取结果更新滚动成功率
    ///
    /// 使用指数加权移动平均，近期结果权重更高
    pub fn record_outcome(&mut self, success: bool) {
        let sample = if success { 1.0 } else { 0.0 };
        self.success_rate =
            SUCCESS_RATE_ALPHA * sample + (1.0 - SUCCESS_RATE_ALPHA) * self.success_rate;
        self.updated_at = Utc::now();
    }
}
