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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::models::engine_state::RuntimeConfig;

/// 应用程序配置设置
///
/// 包含服务器、引擎、抓取协作方和优化服务等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 引擎配置
    pub engine: EngineSettings,
    /// 抓取协作方配置
    pub fetcher: FetcherSettings,
    /// 选择器优化服务配置
    #[serde(default)]
    pub optimizer: OptimizerSettings,
}

/// 服务器配置设置
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 引擎配置设置
#[derive(Debug, Deserialize)]
pub struct EngineSettings {
    /// 全局同时执行的目标任务上限
    pub max_concurrent_targets: usize,
    /// 目标未指定时的默认最大重试次数
    pub default_max_retries: u32,
    /// 监控循环间隔（秒）
    pub monitor_interval_secs: u64,
    /// 连续探测失败多少次进入降级
    pub monitor_max_failures: u32,
    /// 仪表盘保留的最近事件条数
    pub recent_events_capacity: usize,
    /// SSE广播通道容量
    pub broadcast_capacity: usize,
}

impl EngineSettings {
    /// 转换为引擎运行时配置
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            max_concurrent_targets: self.max_concurrent_targets,
            default_max_retries: self.default_max_retries,
        }
    }
}

/// 抓取协作方配置设置
#[derive(Debug, Deserialize)]
pub struct FetcherSettings {
    /// 抓取与解析协作方服务地址
    pub base_url: String,
    /// 单次抓取请求超时（秒）
    pub timeout_secs: u64,
}

/// 选择器优化服务配置设置
#[derive(Debug, Default, Deserialize)]
pub struct OptimizerSettings {
    /// 优化服务地址，缺省时不接入
    pub base_url: Option<String>,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default engine settings
            .set_default("engine.max_concurrent_targets", 5)?
            .set_default("engine.default_max_retries", 3)?
            .set_default("engine.monitor_interval_secs", 10)?
            .set_default("engine.monitor_max_failures", 3)?
            .set_default("engine.recent_events_capacity", 100)?
            .set_default("engine.broadcast_capacity", 256)?
            // Default fetcher settings
            .set_default("fetcher.base_url", "http://127.0.0.1:8600")?
            .set_default("fetcher.timeout_secs", 60)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("HARVESTRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}
