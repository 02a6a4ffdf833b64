// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use harvestrs::domain::models::job::{JobMode, JobStatus};
use harvestrs::domain::repositories::job_repository::{JobQueryParams, JobRepository};
use harvestrs::orchestrator::EngineError;

use super::helpers::{
    create_test_app_with_options, register_target, wait_for_in_flight, wait_for_job_status,
    TestAppOptions,
};

/// 验证并发启动同一目标只有一个赢家，落败的启动不留作业
/// 记录。
#[tokio::test]
async fn test_racing_starts_have_single_winner() {
    let app = create_test_app_with_options(TestAppOptions {
        gated_fetcher: true,
        ..TestAppOptions::default()
    })
    .await;
    let target_id = register_target(&app, "Remote OK").await;

    let (first, second, third) = tokio::join!(
        app.manager.start_job(vec![target_id], 0, JobMode::Manual),
        app.manager.start_job(vec![target_id], 0, JobMode::Manual),
        app.manager.start_job(vec![target_id], 0, JobMode::Manual),
    );

    let outcomes = [first, second, third];
    let winners: Vec<_> = outcomes.iter().filter(|r| r.is_ok()).collect();
    assert_eq!(winners.len(), 1, "exactly one start should win the claim");

    for outcome in &outcomes {
        if let Err(e) = outcome {
            assert!(
                matches!(e, EngineError::Conflict { target_id: t } if *t == target_id),
                "loser should conflict on the contested target, got {:?}",
                e
            );
        }
    }

    // 落败的启动没有留下作业记录
    let rows = app.jobs.query(JobQueryParams::default()).await.unwrap();
    assert_eq!(rows.len(), 1);

    let winner = winners[0].as_ref().unwrap();
    assert_eq!(app.claims.holder(target_id), Some(winner.id));

    // 赢家照常跑完并释放认领
    app.fetcher.release(1);
    wait_for_job_status(&app, winner.id, JobStatus::Completed).await;
    assert!(app.claims.holder(target_id).is_none());
}

/// 验证对已被认领目标的后续启动返回冲突且不产生作业。
#[tokio::test]
async fn test_start_on_claimed_target_conflicts() {
    let app = create_test_app_with_options(TestAppOptions {
        gated_fetcher: true,
        ..TestAppOptions::default()
    })
    .await;
    let target_id = register_target(&app, "Remote OK").await;

    let holder = app
        .manager
        .start_job(vec![target_id], 0, JobMode::Manual)
        .await
        .unwrap();
    wait_for_in_flight(&app, 1).await;

    let denied = app
        .manager
        .start_job(vec![target_id], 0, JobMode::Manual)
        .await;
    assert!(matches!(
        denied,
        Err(EngineError::Conflict { target_id: t }) if t == target_id
    ));

    let rows = app.jobs.query(JobQueryParams::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(app.claims.holder(target_id), Some(holder.id));
}

/// 验证多目标认领是全有或全无：部分冲突时空闲目标也不被
/// 占用。
#[tokio::test]
async fn test_partial_conflict_claims_nothing() {
    let app = create_test_app_with_options(TestAppOptions {
        gated_fetcher: true,
        ..TestAppOptions::default()
    })
    .await;
    let contested = register_target(&app, "Remote OK").await;
    let free = register_target(&app, "We Work Remotely").await;

    let holder = app
        .manager
        .start_job(vec![contested], 0, JobMode::Manual)
        .await
        .unwrap();
    wait_for_in_flight(&app, 1).await;

    let denied = app
        .manager
        .start_job(vec![free, contested], 0, JobMode::Manual)
        .await;
    assert!(matches!(
        denied,
        Err(EngineError::Conflict { target_id: t }) if t == contested
    ));

    assert!(app.claims.holder(free).is_none());
    assert_eq!(app.claims.holder(contested), Some(holder.id));
}
