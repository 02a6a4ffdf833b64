// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供领域仓库接口的具体实现
/// 默认装配为进程内存储，可替换为数据库实现
pub mod job_repo_impl;
pub mod result_repo_impl;
pub mod run_repo_impl;
pub mod target_repo_impl;
