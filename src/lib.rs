// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含控制面的请求与响应DTO
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体和仓库接口
pub mod domain;

/// 引擎模块
///
/// 抓取协作方与优化服务的客户端适配器
pub mod engines;

/// 基础设施模块
///
/// 提供仓库实现与可观测性支撑
pub mod infrastructure;

/// 编排模块
///
/// 作业生命周期、目标认领、并发门控与事件总线
pub mod orchestrator;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由、处理器和错误映射
pub mod presentation;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;
