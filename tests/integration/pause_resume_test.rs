// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

use harvestrs::domain::models::job::{JobMode, JobStatus};
use harvestrs::domain::models::run::TargetTaskStatus;
use harvestrs::domain::repositories::run_repository::RunRepository;
use harvestrs::orchestrator::manager::JobSelector;
use uuid::Uuid;

use super::helpers::{
    create_test_app_with_options, register_target, wait_for_completed_tasks, wait_for_in_flight,
    wait_for_job_status, wait_for_total_calls, TestApp, TestAppOptions,
};

async fn wait_for_run_closed(app: &TestApp, run_id: Uuid) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let run = app
            .runs
            .find_run_by_id(run_id)
            .await
            .unwrap()
            .expect("run should exist");
        if run.finished_at.is_some() {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("run {} never closed", run_id);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// 验证抓取进行中暂停：已完成的保留，进行中的中止且不计
/// 尝试，暂停后不再分发，恢复后只执行剩下的目标。
#[tokio::test]
async fn test_pause_midway_then_resume_runs_remaining() {
    let app = create_test_app_with_options(TestAppOptions {
        max_concurrent_targets: 2,
        gated_fetcher: true,
        ..TestAppOptions::default()
    })
    .await;

    let mut target_ids = Vec::new();
    for name in [
        "Remote OK",
        "We Work Remotely",
        "Hacker News Jobs",
        "Stack Overflow Jobs",
        "Otta",
    ] {
        target_ids.push(register_target(&app, name).await);
    }

    let job = app
        .manager
        .start_job(target_ids.clone(), 0, JobMode::Manual)
        .await
        .unwrap();
    let first_run = app
        .runs
        .latest_run_for_job(job.id)
        .await
        .unwrap()
        .expect("run should exist");

    // 放行前两个，等它们完成后第三、四个进入抓取
    wait_for_in_flight(&app, 2).await;
    app.fetcher.release(2);
    wait_for_completed_tasks(&app, first_run.id, 2).await;
    wait_for_in_flight(&app, 2).await;
    assert_eq!(app.fetcher.total_calls(), 4);

    let paused = app.manager.pause_jobs(JobSelector::Ids(vec![job.id])).await;
    assert_eq!(paused.unwrap(), 1);

    wait_for_job_status(&app, job.id, JobStatus::Paused).await;
    wait_for_run_closed(&app, first_run.id).await;

    // 暂停后没有新的分发
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.fetcher.total_calls(), 4);

    let tasks = app.runs.find_tasks_by_run(first_run.id).await.unwrap();
    let completed = tasks
        .iter()
        .filter(|t| t.status == TargetTaskStatus::Completed)
        .count();
    let pending = tasks
        .iter()
        .filter(|t| t.status == TargetTaskStatus::Pending)
        .count();
    assert_eq!(completed, 2);
    assert_eq!(pending, 3);
    // 中止的尝试不消耗预算
    assert!(tasks
        .iter()
        .filter(|t| t.status == TargetTaskStatus::Pending)
        .all(|t| t.attempt_count == 0));

    // 暂停期间认领保持
    for id in &target_ids {
        assert_eq!(app.claims.holder(*id), Some(job.id));
    }

    let resumed = app.manager.resume_job(job.id).await.unwrap();
    assert_eq!(resumed.status, JobStatus::Running);

    app.fetcher.release(8);
    wait_for_job_status(&app, job.id, JobStatus::Completed).await;

    // 只有剩下的3个目标被重新抓取
    assert_eq!(app.fetcher.total_calls(), 7);

    let runs = app.runs.find_runs_by_job(job.id).await.unwrap();
    assert_eq!(runs.len(), 2);
    let second_run = runs
        .iter()
        .find(|r| r.id != first_run.id)
        .expect("resume should open a new run");
    assert_eq!(second_run.total_targets, 3);
    assert_eq!(second_run.completed_targets, 3);
    assert_eq!(second_run.failed_targets, 0);

    for id in &target_ids {
        assert!(app.claims.holder(*id).is_none());
    }
}

/// 验证暂停是幂等的：第二次暂停没有可作用的作业，计数为0。
#[tokio::test]
async fn test_pause_is_idempotent() {
    let app = create_test_app_with_options(TestAppOptions {
        gated_fetcher: true,
        ..TestAppOptions::default()
    })
    .await;
    let target_id = register_target(&app, "Remote OK").await;

    let job = app
        .manager
        .start_job(vec![target_id], 0, JobMode::Manual)
        .await
        .unwrap();
    wait_for_in_flight(&app, 1).await;

    let first = app.manager.pause_jobs(JobSelector::AllRunning).await.unwrap();
    assert_eq!(first, 1);
    wait_for_job_status(&app, job.id, JobStatus::Paused).await;

    let second = app.manager.pause_jobs(JobSelector::AllRunning).await.unwrap();
    assert_eq!(second, 0);

    // 指名暂停一个已暂停的作业同样被静默跳过
    let third = app
        .manager
        .pause_jobs(JobSelector::Ids(vec![job.id]))
        .await
        .unwrap();
    assert_eq!(third, 0);
}

/// 验证按ID暂停只影响指定作业，其余作业照常执行。
#[tokio::test]
async fn test_pause_targets_only_selected_jobs() {
    let app = create_test_app_with_options(TestAppOptions {
        gated_fetcher: true,
        ..TestAppOptions::default()
    })
    .await;
    let first_target = register_target(&app, "Remote OK").await;
    let second_target = register_target(&app, "We Work Remotely").await;

    let first_job = app
        .manager
        .start_job(vec![first_target], 0, JobMode::Manual)
        .await
        .unwrap();
    let second_job = app
        .manager
        .start_job(vec![second_target], 0, JobMode::Manual)
        .await
        .unwrap();
    wait_for_total_calls(&app, 2).await;

    let paused = app
        .manager
        .pause_jobs(JobSelector::Ids(vec![first_job.id]))
        .await
        .unwrap();
    assert_eq!(paused, 1);
    wait_for_job_status(&app, first_job.id, JobStatus::Paused).await;

    // 另一个作业不受影响，放行后正常完成
    app.fetcher.release(4);
    wait_for_job_status(&app, second_job.id, JobStatus::Completed).await;
    assert!(app.claims.holder(second_target).is_none());
    assert_eq!(app.claims.holder(first_target), Some(first_job.id));
}
