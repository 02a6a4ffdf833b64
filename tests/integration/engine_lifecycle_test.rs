// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use harvestrs::domain::models::job::{JobMode, JobStatus};
use harvestrs::domain::models::run::TargetTaskStatus;
use harvestrs::domain::repositories::result_repository::ResultRepository;
use harvestrs::domain::repositories::run_repository::RunRepository;
use harvestrs::engines::traits::FetchError;
use harvestrs::orchestrator::events::EngineEvent;

use super::helpers::{
    create_test_app, create_test_app_with_options, register_target, register_target_with,
    wait_for_in_flight, wait_for_job_status, wait_for_total_calls, TestAppOptions,
};

/// 验证并发上限为2时3个目标全部完成，作业进入Completed，
/// 认领全部释放。
#[tokio::test]
async fn test_bounded_concurrency_all_targets_complete() {
    let app = create_test_app_with_options(TestAppOptions {
        max_concurrent_targets: 2,
        gated_fetcher: true,
        ..TestAppOptions::default()
    })
    .await;

    let first = register_target(&app, "Remote OK").await;
    let second = register_target(&app, "We Work Remotely").await;
    let third = register_target(&app, "Hacker News Jobs").await;

    let job = app
        .manager
        .start_job(vec![first, second, third], 0, JobMode::Manual)
        .await
        .expect("start should succeed");
    assert_eq!(job.status, JobStatus::Running);

    // 前两个目标占满额度，第三个必须等待
    wait_for_in_flight(&app, 2).await;
    assert_eq!(app.fetcher.total_calls(), 2);

    // 放行一个后第三个目标才被分发
    app.fetcher.release(1);
    wait_for_total_calls(&app, 3).await;
    app.fetcher.release(2);

    wait_for_job_status(&app, job.id, JobStatus::Completed).await;

    let run = app
        .runs
        .latest_run_for_job(job.id)
        .await
        .unwrap()
        .expect("run should exist");
    assert_eq!(run.total_targets, 3);
    assert_eq!(run.completed_targets, 3);
    assert_eq!(run.failed_targets, 0);
    assert!(run.finished_at.is_some());
    assert_eq!(run.avg_response_time_ms, Some(8));

    let results = app.results.find_by_run(run.id).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.success));

    for target_id in [first, second, third] {
        assert!(app.claims.holder(target_id).is_none());
    }
}

/// 验证瞬时失败按退避重试，第三次尝试成功后作业完成。
#[tokio::test]
async fn test_transient_failures_retried_until_success() {
    let app = create_test_app().await;
    let target_id = register_target_with(&app, "Remote OK", 0, 3).await;
    app.fetcher.script(
        target_id,
        vec![
            Err(FetchError::Upstream { status: 502 }),
            Err(FetchError::Timeout),
        ],
    );

    let job = app
        .manager
        .start_job(vec![target_id], 0, JobMode::Manual)
        .await
        .unwrap();
    wait_for_job_status(&app, job.id, JobStatus::Completed).await;

    assert_eq!(app.fetcher.total_calls(), 3);

    let run = app
        .runs
        .latest_run_for_job(job.id)
        .await
        .unwrap()
        .expect("run should exist");
    let tasks = app.runs.find_tasks_by_run(run.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TargetTaskStatus::Completed);
    assert_eq!(tasks[0].attempt_count, 3);

    // 两次失败和一次成功都留有结果记录
    let results = app.results.find_by_run(run.id).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results.iter().filter(|r| r.success).count(), 1);
}

/// 验证瞬时失败的总尝试次数不超过max_retries+1，预算耗尽
/// 后任务和作业都进入失败态。
#[tokio::test]
async fn test_transient_retries_exhaust_budget() {
    let app = create_test_app().await;
    let target_id = register_target_with(&app, "Remote OK", 0, 1).await;
    app.fetcher.script(
        target_id,
        vec![
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
        ],
    );

    let job = app
        .manager
        .start_job(vec![target_id], 0, JobMode::Manual)
        .await
        .unwrap();
    wait_for_job_status(&app, job.id, JobStatus::Failed).await;

    // max_retries=1，共1+1次尝试，剧本里第3个失败不会被消费
    assert_eq!(app.fetcher.total_calls(), 2);

    let run = app
        .runs
        .latest_run_for_job(job.id)
        .await
        .unwrap()
        .expect("run should exist");
    let tasks = app.runs.find_tasks_by_run(run.id).await.unwrap();
    assert_eq!(tasks[0].status, TargetTaskStatus::Failed);
    assert_eq!(tasks[0].attempt_count, 2);
    assert!(tasks[0].last_error.is_some());
    assert_eq!(run.failed_targets, 1);

    assert!(app.claims.holder(target_id).is_none());
}

/// 验证永久性失败不消耗重试，单次尝试后任务即失败。
#[tokio::test]
async fn test_permanent_failure_never_retried() {
    let app = create_test_app().await;
    let target_id = register_target_with(&app, "Remote OK", 0, 3).await;
    app.fetcher
        .script(target_id, vec![Err(FetchError::Rejected { status: 403 })]);

    let job = app
        .manager
        .start_job(vec![target_id], 0, JobMode::Manual)
        .await
        .unwrap();
    wait_for_job_status(&app, job.id, JobStatus::Failed).await;

    assert_eq!(app.fetcher.total_calls(), 1);

    let run = app
        .runs
        .latest_run_for_job(job.id)
        .await
        .unwrap()
        .expect("run should exist");
    let tasks = app.runs.find_tasks_by_run(run.id).await.unwrap();
    assert_eq!(tasks[0].status, TargetTaskStatus::Failed);
    assert_eq!(tasks[0].attempt_count, 1);
}

/// 验证部分成功的作业仍计为Completed，成败数分开统计。
#[tokio::test]
async fn test_mixed_outcome_counts_as_completed() {
    let app = create_test_app().await;
    let good = register_target(&app, "Remote OK").await;
    let bad = register_target(&app, "We Work Remotely").await;
    app.fetcher
        .script(bad, vec![Err(FetchError::Rejected { status: 404 })]);

    let job = app
        .manager
        .start_job(vec![good, bad], 0, JobMode::Manual)
        .await
        .unwrap();
    wait_for_job_status(&app, job.id, JobStatus::Completed).await;

    let run = app
        .runs
        .latest_run_for_job(job.id)
        .await
        .unwrap()
        .expect("run should exist");
    assert_eq!(run.completed_targets, 1);
    assert_eq!(run.failed_targets, 1);
}

/// 验证进度事件单调推进，最后一条覆盖全部目标。
#[tokio::test]
async fn test_progress_events_are_monotonic() {
    let app = create_test_app().await;
    let first = register_target(&app, "Remote OK").await;
    let second = register_target(&app, "We Work Remotely").await;
    let third = register_target(&app, "Hacker News Jobs").await;

    let job = app
        .manager
        .start_job(vec![first, second, third], 0, JobMode::Manual)
        .await
        .unwrap();
    wait_for_job_status(&app, job.id, JobStatus::Completed).await;

    let mut last_done = 0u32;
    let mut last_percentage = 0.0f64;
    let mut seen = 0;
    for envelope in app.ring_buffer.recent() {
        if let EngineEvent::ProgressUpdate {
            job_id,
            completed,
            failed,
            total,
            percentage,
            ..
        } = envelope.event
        {
            if job_id != job.id {
                continue;
            }
            seen += 1;
            let done = completed + failed;
            assert!(done >= last_done, "progress went backwards");
            assert!(percentage >= last_percentage);
            assert_eq!(total, 3);
            last_done = done;
            last_percentage = percentage;
        }
    }
    assert_eq!(seen, 3);
    assert_eq!(last_done, 3);
    assert!((last_percentage - 100.0).abs() < f64::EPSILON);
}
