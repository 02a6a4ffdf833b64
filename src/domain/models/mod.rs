// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 目标配置（target）：可抓取站点及其抓取参数
/// - 抓取作业（job）：针对一组目标的批量抓取生命周期
/// - 抓取运行（run）：作业的一次实际执行及其单目标任务
/// - 抓取结果（scrape_result）：每次终止尝试的只追加记录
/// - 引擎状态（engine_state）：引擎级聚合状态与运行时配置
///
/// 这些模型构成了系统的数据基础，定义了业务概念的
/// 结构和行为，是领域驱动设计的核心组成部分。
pub mod engine_state;
pub mod job;
pub mod run;
pub mod scrape_result;
pub mod target;
