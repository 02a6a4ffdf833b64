// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use harvestrs::domain::models::job::JobStatus;

use super::helpers::{
    create_test_app, create_test_app_with_options, register_target, wait_for_in_flight,
    wait_for_job_status, TestAppOptions,
};

/// 验证健康检查与版本端点。
#[tokio::test]
async fn test_health_and_version() {
    let app = create_test_app().await;

    let health = app.server.get("/health").await;
    assert_eq!(health.status_code(), StatusCode::OK);
    assert_eq!(health.text(), "OK");

    let version = app.server.get("/v1/version").await;
    assert_eq!(version.status_code(), StatusCode::OK);
    assert_eq!(version.text(), env!("CARGO_PKG_VERSION"));
}

/// 验证目标注册表的完整增删改查流程。
#[tokio::test]
async fn test_target_crud_roundtrip() {
    let app = create_test_app().await;

    let created = app
        .server
        .post("/v1/targets")
        .json(&json!({
            "name": "Remote OK",
            "endpoint": "https://remoteok.example.com/api",
            "max_pages": 3
        }))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    let body: serde_json::Value = created.json();
    let target_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["fetch_mode"], "structured_feed");
    assert_eq!(body["max_pages"], 3);
    assert_eq!(body["active"], true);

    let listed = app.server.get("/v1/targets").await;
    assert_eq!(listed.status_code(), StatusCode::OK);
    let listed: serde_json::Value = listed.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let fetched = app.server.get(&format!("/v1/targets/{}", target_id)).await;
    assert_eq!(fetched.status_code(), StatusCode::OK);

    let patched = app
        .server
        .patch(&format!("/v1/targets/{}", target_id))
        .json(&json!({ "rate_limit_delay_ms": 2000, "active": false }))
        .await;
    assert_eq!(patched.status_code(), StatusCode::OK);
    let patched: serde_json::Value = patched.json();
    assert_eq!(patched["rate_limit_delay_ms"], 2000);
    assert_eq!(patched["active"], false);
    // 未给出的字段保持原值
    assert_eq!(patched["endpoint"], "https://remoteok.example.com/api");

    // 未激活目标从默认列表里消失
    let listed: serde_json::Value = app.server.get("/v1/targets").await.json();
    assert!(listed.as_array().unwrap().is_empty());
    let listed: serde_json::Value = app
        .server
        .get("/v1/targets")
        .add_query_param("include_inactive", "true")
        .await
        .json();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let deleted = app
        .server
        .delete(&format!("/v1/targets/{}", target_id))
        .await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

    let missing = app.server.get(&format!("/v1/targets/{}", target_id)).await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

/// 验证入参校验失败返回400并带错误说明。
#[tokio::test]
async fn test_validation_errors_return_bad_request() {
    let app = create_test_app().await;

    let bad_url = app
        .server
        .post("/v1/targets")
        .json(&json!({ "name": "Remote OK", "endpoint": "not a url" }))
        .await;
    assert_eq!(bad_url.status_code(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = bad_url.json();
    assert!(body["error"].as_str().is_some());

    let empty_targets = app
        .server
        .post("/v1/engine/start")
        .json(&json!({ "target_ids": [] }))
        .await;
    assert_eq!(empty_targets.status_code(), StatusCode::BAD_REQUEST);
}

/// 验证对未注册目标的启动返回404。
#[tokio::test]
async fn test_start_unknown_target_not_found() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/v1/engine/start")
        .json(&json!({ "target_ids": [Uuid::new_v4()] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

/// 验证启动返回201和作业标识，作业完成后可通过查询端点
/// 读到详情。
#[tokio::test]
async fn test_start_job_and_query_detail() {
    let app = create_test_app().await;
    let target_id = register_target(&app, "Remote OK").await;

    let started = app
        .server
        .post("/v1/engine/start")
        .json(&json!({ "target_ids": [target_id] }))
        .await;
    assert_eq!(started.status_code(), StatusCode::CREATED);
    let body: serde_json::Value = started.json();
    assert_eq!(body["status"], "running");
    let job_id = Uuid::parse_str(body["job_id"].as_str().unwrap()).unwrap();

    wait_for_job_status(&app, job_id, JobStatus::Completed).await;

    let detail = app.server.get(&format!("/v1/jobs/{}", job_id)).await;
    assert_eq!(detail.status_code(), StatusCode::OK);
    let detail: serde_json::Value = detail.json();
    assert_eq!(detail["status"], "completed");
    assert_eq!(detail["latest_run"]["completed_targets"], 1);

    let filtered = app
        .server
        .get("/v1/jobs")
        .add_query_param("status", "completed")
        .await;
    let filtered: serde_json::Value = filtered.json();
    assert_eq!(filtered.as_array().unwrap().len(), 1);

    let none = app
        .server
        .get("/v1/jobs")
        .add_query_param("status", "failed")
        .await;
    let none: serde_json::Value = none.json();
    assert!(none.as_array().unwrap().is_empty());

    let runs = app
        .server
        .get("/v1/runs")
        .add_query_param("job_id", job_id.to_string())
        .await;
    let runs: serde_json::Value = runs.json();
    let run_list = runs.as_array().unwrap();
    assert_eq!(run_list.len(), 1);
    let run_id = run_list[0]["id"].as_str().unwrap();

    let run_detail = app.server.get(&format!("/v1/runs/{}", run_id)).await;
    assert_eq!(run_detail.status_code(), StatusCode::OK);
    let run_detail: serde_json::Value = run_detail.json();
    assert_eq!(run_detail["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(run_detail["tasks"][0]["status"], "completed");
}

/// 验证查询不存在的作业返回404。
#[tokio::test]
async fn test_missing_job_returns_not_found() {
    let app = create_test_app().await;
    let response = app.server.get(&format!("/v1/jobs/{}", Uuid::new_v4())).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

/// 验证暂停、恢复与重置的HTTP语义。
#[tokio::test]
async fn test_pause_resume_reset_flow() {
    let app = create_test_app_with_options(TestAppOptions {
        gated_fetcher: true,
        ..TestAppOptions::default()
    })
    .await;
    let target_id = register_target(&app, "Remote OK").await;

    let started: serde_json::Value = app
        .server
        .post("/v1/engine/start")
        .json(&json!({ "target_ids": [target_id] }))
        .await
        .json();
    let job_id = Uuid::parse_str(started["job_id"].as_str().unwrap()).unwrap();
    wait_for_in_flight(&app, 1).await;

    let paused = app
        .server
        .post("/v1/engine/pause")
        .json(&json!({ "job_ids": [job_id] }))
        .await;
    assert_eq!(paused.status_code(), StatusCode::OK);
    let paused: serde_json::Value = paused.json();
    assert_eq!(paused["paused_count"], 1);
    wait_for_job_status(&app, job_id, JobStatus::Paused).await;

    // 恢复不存在的作业
    let bad_resume = app
        .server
        .post("/v1/engine/resume")
        .json(&json!({ "job_id": Uuid::new_v4() }))
        .await;
    assert_eq!(bad_resume.status_code(), StatusCode::NOT_FOUND);

    let resumed = app
        .server
        .post("/v1/engine/resume")
        .json(&json!({ "job_id": job_id }))
        .await;
    assert_eq!(resumed.status_code(), StatusCode::OK);
    let resumed: serde_json::Value = resumed.json();
    assert_eq!(resumed["status"], "running");

    app.fetcher.release(4);
    wait_for_job_status(&app, job_id, JobStatus::Completed).await;

    // 已完成的作业不能再恢复
    let stale_resume = app
        .server
        .post("/v1/engine/resume")
        .json(&json!({ "job_id": job_id }))
        .await;
    assert_eq!(stale_resume.status_code(), StatusCode::BAD_REQUEST);

    let unconfirmed = app
        .server
        .post("/v1/engine/reset")
        .json(&json!({ "confirm": false }))
        .await;
    assert_eq!(unconfirmed.status_code(), StatusCode::BAD_REQUEST);

    let reset = app
        .server
        .post("/v1/engine/reset")
        .json(&json!({ "confirm": true }))
        .await;
    assert_eq!(reset.status_code(), StatusCode::OK);
    let reset: serde_json::Value = reset.json();
    assert_eq!(reset["status"], "reset");
}

/// 验证启动冲突与删除被认领目标都映射为409。
#[tokio::test]
async fn test_conflicts_map_to_http_409() {
    let app = create_test_app_with_options(TestAppOptions {
        gated_fetcher: true,
        ..TestAppOptions::default()
    })
    .await;
    let target_id = register_target(&app, "Remote OK").await;

    let first = app
        .server
        .post("/v1/engine/start")
        .json(&json!({ "target_ids": [target_id] }))
        .await;
    assert_eq!(first.status_code(), StatusCode::CREATED);
    wait_for_in_flight(&app, 1).await;

    let second = app
        .server
        .post("/v1/engine/start")
        .json(&json!({ "target_ids": [target_id] }))
        .await;
    assert_eq!(second.status_code(), StatusCode::CONFLICT);

    let deleted = app
        .server
        .delete(&format!("/v1/targets/{}", target_id))
        .await;
    assert_eq!(deleted.status_code(), StatusCode::CONFLICT);
}

/// 验证状态、心跳与仪表盘端点的内容。
#[tokio::test]
async fn test_state_heartbeat_and_dashboard() {
    let app = create_test_app().await;
    let target_id = register_target(&app, "Remote OK").await;

    let started: serde_json::Value = app
        .server
        .post("/v1/engine/start")
        .json(&json!({ "target_ids": [target_id] }))
        .await
        .json();
    let job_id = Uuid::parse_str(started["job_id"].as_str().unwrap()).unwrap();
    wait_for_job_status(&app, job_id, JobStatus::Completed).await;

    let heartbeat = app.server.post("/v1/engine/heartbeat").await;
    assert_eq!(heartbeat.status_code(), StatusCode::OK);
    let heartbeat: serde_json::Value = heartbeat.json();
    assert_eq!(heartbeat["status"], "idle");
    assert_eq!(heartbeat["targets_completed_today"], 1);
    assert_eq!(heartbeat["targets_failed_today"], 0);

    let state = app.server.get("/v1/engine/state").await;
    assert_eq!(state.status_code(), StatusCode::OK);
    let state: serde_json::Value = state.json();
    assert_eq!(state["status"], "idle");
    assert_eq!(state["active_jobs"], 0);

    let dashboard = app.server.get("/v1/dashboard").await;
    assert_eq!(dashboard.status_code(), StatusCode::OK);
    let dashboard: serde_json::Value = dashboard.json();
    assert_eq!(dashboard["engine"]["status"], "idle");
    let events = dashboard["recent_events"].as_array().unwrap();
    assert!(!events.is_empty());
    assert!(events
        .iter()
        .any(|e| e["event"] == "job_completed" && e["job_id"] == job_id.to_string()));
}
