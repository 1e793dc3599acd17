//! In-process scenario tests for fxl-daemon HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test calls `routes::build_router` and drives it via
//! `tower::ServiceExt::oneshot`; no network I/O required.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use fxl_daemon::{routes, state};
use http_body_util::BodyExt;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a fresh in-process router backed by a clean AppState over a temp
/// scenario directory.
fn make_router() -> (tempfile::TempDir, axum::Router) {
    let dir = tempfile::tempdir().expect("tempdir");
    let st = Arc::new(state::AppState::for_tests(dir.path()).expect("state"));
    (dir, routes::build_router(st))
}

/// Drive the router with a single request and return (status, body_bytes).
async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

/// A scenario that asserts session state only: fast and clock-independent.
fn quick_scenario(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": "session state check",
        "sequence": [
            {
                "action": "VERIFY_SESSION_STATE",
                "parameters": { "expectedState": "LOGGED_ON" },
                "timeout_ms": 0
            }
        ]
    })
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let (_dir, router) = make_router();
    let (status, body) = call(router, get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "fxl-daemon");
}

// ---------------------------------------------------------------------------
// Scenario CRUD
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_then_list_then_get_scenario() {
    let (_dir, router) = make_router();

    let (status, body) = call(router.clone(), post_json("/v1/scenarios", &quick_scenario("scn-1"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(parse_json(body)["id"], "scn-1");

    let (status, body) = call(router.clone(), get("/v1/scenarios")).await;
    assert_eq!(status, StatusCode::OK);
    let listed = parse_json(body);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, body) = call(router, get("/v1/scenarios/scn-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["name"], "session state check");
}

#[tokio::test]
async fn create_without_id_assigns_one() {
    let (_dir, router) = make_router();
    let mut scenario = quick_scenario("");
    scenario["id"] = serde_json::json!("");

    let (status, body) = call(router, post_json("/v1/scenarios", &scenario)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = parse_json(body)["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
}

#[tokio::test]
async fn get_unknown_scenario_is_404() {
    let (_dir, router) = make_router();
    let (status, body) = call(router, get("/v1/scenarios/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(parse_json(body)["error"]
        .as_str()
        .unwrap()
        .contains("scenario not found"));
}

#[tokio::test]
async fn delete_scenario_then_404_on_get() {
    let (_dir, router) = make_router();
    call(router.clone(), post_json("/v1/scenarios", &quick_scenario("scn-del"))).await;

    let del = Request::builder()
        .method("DELETE")
        .uri("/v1/scenarios/scn-del")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = call(router.clone(), del).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(router, get("/v1/scenarios/scn-del")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sync_execute_returns_a_terminal_record() {
    let (_dir, router) = make_router();
    call(router.clone(), post_json("/v1/scenarios", &quick_scenario("scn-run"))).await;

    let exec = Request::builder()
        .method("POST")
        .uri("/v1/scenarios/scn-run/execute")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = call(router.clone(), exec).await;
    assert_eq!(status, StatusCode::OK);

    let record = parse_json(body);
    assert_eq!(record["status"], "PASSED");
    assert_eq!(record["scenario_id"], "scn-run");

    // The record is also fetchable by run id.
    let run_id = record["run_id"].as_str().unwrap().to_string();
    let (status, body) = call(router, get(&format!("/v1/runs/{run_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["status"], "PASSED");
}

#[tokio::test]
async fn async_execute_returns_202_with_run_id() {
    let (_dir, router) = make_router();
    call(router.clone(), post_json("/v1/scenarios", &quick_scenario("scn-async"))).await;

    let exec = Request::builder()
        .method("POST")
        .uri("/v1/scenarios/scn-async/execute?mode=async")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = call(router.clone(), exec).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let run_id = parse_json(body)["run_id"].as_str().unwrap().to_string();

    // Poll until the detached run reaches a terminal status.
    let mut last_status = String::new();
    for _ in 0..100 {
        let (status, body) = call(router.clone(), get(&format!("/v1/runs/{run_id}"))).await;
        if status == StatusCode::OK {
            last_status = parse_json(body)["status"].as_str().unwrap().to_string();
            if last_status != "RUNNING" {
                break;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(last_status, "PASSED");
}

#[tokio::test]
async fn execute_unknown_scenario_is_404() {
    let (_dir, router) = make_router();
    let exec = Request::builder()
        .method("POST")
        .uri("/v1/scenarios/ghost/execute")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = call(router, exec).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failing_scenario_surfaces_failures_in_the_record() {
    let (_dir, router) = make_router();
    let scenario = serde_json::json!({
        "id": "scn-fail",
        "name": "unknown action",
        "sequence": [ { "action": "NOT_A_REAL_ACTION", "timeout_ms": 0 } ]
    });
    call(router.clone(), post_json("/v1/scenarios", &scenario)).await;

    let exec = Request::builder()
        .method("POST")
        .uri("/v1/scenarios/scn-fail/execute")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = call(router, exec).await;
    assert_eq!(status, StatusCode::OK);

    let record = parse_json(body);
    assert_eq!(record["status"], "FAILED");
    assert_eq!(record["failures"][0], "unknown action: NOT_A_REAL_ACTION");
}

#[tokio::test]
async fn unknown_run_id_is_404() {
    let (_dir, router) = make_router();
    let (status, _) = call(router.clone(), get("/v1/runs/not-a-uuid")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(
        router,
        get(&format!("/v1/runs/{}", uuid::Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
