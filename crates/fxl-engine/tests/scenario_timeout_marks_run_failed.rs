//! Scenario: silent counterparty → bounded wait → FAILED with timeout wording.
//!
//! # Invariants under test
//!
//! 1. The same order scenario that passes against a responsive session fails
//!    against one that never responds, with the failure message naming the
//!    timeout ("no execution report received within timeout"); a timeout is
//!    distinguishable from a validation defect.
//! 2. The wait returns promptly: the whole run completes within the step
//!    timeout plus one poll interval plus slack, not the executor default.
//! 3. A failed step halts the run; later steps never execute.

use std::time::{Duration, Instant};

use fxl_engine::ScenarioExecutor;
use fxl_model::{RunStatus, Scenario, Step, StepAction};
use fxl_sim::{PaperSession, ResponderConfig};
use fxl_validate::ComplianceConfig;

fn scenario(steps: Vec<Step>) -> Scenario {
    Scenario {
        id: "scn-timeout".to_string(),
        name: "silent counterparty".to_string(),
        description: String::new(),
        config: Default::default(),
        sequence: steps,
    }
}

#[tokio::test]
async fn silent_session_fails_with_timeout_wording() {
    let mut ex = ScenarioExecutor::standard(
        PaperSession::new("sess-silent", ResponderConfig::silent()),
        ComplianceConfig::wide_open(),
    );

    let started = Instant::now();
    let result = ex
        .execute(&scenario(vec![
            Step::new(StepAction::SendNewOrder)
                .with_param("clOrdID", "t-1")
                .with_param("quantity", "100"),
            Step::new(StepAction::WaitExecutionReport)
                .with_param("150", "0")
                .with_timeout(Duration::from_millis(1000)),
            // Must never run.
            Step::new(StepAction::SendHeartbeat),
        ]))
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(
        result.failures,
        vec!["no execution report received within timeout"]
    );

    // 1000 ms timeout + 100 ms poll + scheduling slack.
    assert!(
        started.elapsed() < Duration::from_millis(2000),
        "wait overran its bound: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn cancel_and_modify_timeouts_have_distinct_wording() {
    let mut ex = ScenarioExecutor::standard(
        PaperSession::new("sess-silent-2", ResponderConfig::silent()),
        ComplianceConfig::wide_open(),
    );
    let result = ex
        .execute(&scenario(vec![
            Step::new(StepAction::SendNewOrder).with_param("clOrdID", "t-2"),
            Step::new(StepAction::CancelOrder)
                .with_param("clOrdID", "t-2-cxl")
                .with_param("origClOrdID", "t-2"),
            Step::new(StepAction::WaitOrderCancelResponse)
                .with_timeout(Duration::from_millis(300)),
        ]))
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(
        result.failures,
        vec!["no order cancel response received within timeout"]
    );
}

#[tokio::test]
async fn expected_result_timeout_reports_the_configured_window() {
    let mut ex = ScenarioExecutor::standard(
        PaperSession::new("sess-silent-3", ResponderConfig::silent()),
        ComplianceConfig::wide_open(),
    );
    let result = ex
        .execute(&scenario(vec![Step::new(StepAction::SendNewOrder)
            .with_param("clOrdID", "t-3")
            .with_timeout(Duration::from_millis(400))
            .with_expected(fxl_model::ExpectedResult::of_type("8"))]))
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(
        result.failures,
        vec!["no matching response received within timeout (400 ms)"]
    );
}
