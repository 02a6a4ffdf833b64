// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 仓库接口定义了数据持久化的抽象契约，具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 作业仓库（job_repository）：管理抓取作业的生命周期记录
/// - 结果仓库（result_repository）：管理只追加的抓取结果
/// - 运行仓库（run_repository）：管理抓取运行及其单目标任务
/// - 目标仓库（target_repository）：管理目标站点配置
///
/// 这些接口确保了领域层不依赖于具体的数据存储技术，
/// 提高了系统的可测试性和可维护性.
pub mod job_repository;
pub mod result_repository;
pub mod run_repository;
pub mod target_repository;
