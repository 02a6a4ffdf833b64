// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use harvestrs::domain::models::engine_state::EngineStatus;
use harvestrs::domain::models::job::{JobMode, JobStatus};
use harvestrs::domain::repositories::job_repository::{JobQueryParams, JobRepository};
use harvestrs::domain::repositories::run_repository::RunRepository;
use harvestrs::domain::repositories::target_repository::TargetRepository;
use harvestrs::orchestrator::manager::JobSelector;

use super::helpers::{
    create_test_app, create_test_app_with_options, register_target, wait_for_in_flight,
    wait_for_job_status, TestAppOptions,
};

/// 验证硬重置取消运行中与已暂停的作业、释放认领并恢复引擎
/// 状态，但不动目标注册表和历史记录。
#[tokio::test]
async fn test_reset_cancels_active_jobs_and_releases_claims() {
    let app = create_test_app_with_options(TestAppOptions {
        gated_fetcher: true,
        ..TestAppOptions::default()
    })
    .await;
    let running_target = register_target(&app, "Remote OK").await;
    let paused_target = register_target(&app, "We Work Remotely").await;

    let running_job = app
        .manager
        .start_job(vec![running_target], 0, JobMode::Manual)
        .await
        .unwrap();
    let paused_job = app
        .manager
        .start_job(vec![paused_target], 0, JobMode::Manual)
        .await
        .unwrap();
    wait_for_in_flight(&app, 2).await;

    app.manager
        .pause_jobs(JobSelector::Ids(vec![paused_job.id]))
        .await
        .unwrap();
    wait_for_job_status(&app, paused_job.id, JobStatus::Paused).await;

    app.manager.hard_reset(true, false, false).await.unwrap();

    wait_for_job_status(&app, running_job.id, JobStatus::Cancelled).await;
    wait_for_job_status(&app, paused_job.id, JobStatus::Cancelled).await;

    assert!(app.claims.holder(running_target).is_none());
    assert!(app.claims.holder(paused_target).is_none());

    let state = app.manager.engine_state();
    assert_eq!(state.status, EngineStatus::Idle);
    assert_eq!(state.active_jobs, 0);

    // 历史与注册表保留
    let rows = app.jobs.query(JobQueryParams::default()).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(app.targets.list(true).await.unwrap().len(), 2);

    // 重置后同一目标可以立即再次启动
    let restarted = app
        .manager
        .start_job(vec![running_target], 0, JobMode::Manual)
        .await
        .unwrap();
    app.fetcher.release(8);
    wait_for_job_status(&app, restarted.id, JobStatus::Completed).await;
}

/// 验证wipe_data清空作业、运行与结果历史但保留目标。
#[tokio::test]
async fn test_reset_wipe_data_clears_history_keeps_targets() {
    let app = create_test_app().await;
    let target_id = register_target(&app, "Remote OK").await;

    let job = app
        .manager
        .start_job(vec![target_id], 0, JobMode::Manual)
        .await
        .unwrap();
    wait_for_job_status(&app, job.id, JobStatus::Completed).await;

    app.manager.hard_reset(true, true, false).await.unwrap();

    let rows = app.jobs.query(JobQueryParams::default()).await.unwrap();
    assert!(rows.is_empty());
    assert!(app
        .runs
        .latest_run_for_job(job.id)
        .await
        .unwrap()
        .is_none());
    assert_eq!(app.targets.list(true).await.unwrap().len(), 1);
}

/// 验证wipe_config清空目标注册表但保留抓取历史。
#[tokio::test]
async fn test_reset_wipe_config_clears_targets_keeps_history() {
    let app = create_test_app().await;
    let target_id = register_target(&app, "Remote OK").await;

    let job = app
        .manager
        .start_job(vec![target_id], 0, JobMode::Manual)
        .await
        .unwrap();
    wait_for_job_status(&app, job.id, JobStatus::Completed).await;

    app.manager.hard_reset(true, false, true).await.unwrap();

    assert!(app.targets.list(true).await.unwrap().is_empty());
    let rows = app.jobs.query(JobQueryParams::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
}
