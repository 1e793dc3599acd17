//! Scenario: order round-trip against a responsive paper session.
//!
//! # Invariants under test
//!
//! 1. A send-new-order step followed by a wait-execution-report step, against
//!    a session that acks within 50 ms, yields overall status PASSED.
//! 2. The matched execution report flows through the validation chain and
//!    advances the run's lifecycle tracker (order ends in NEW after the ack,
//!    FILLED after a scripted fill).
//! 3. A full cancel conversation (order → ack → cancel → cancel ack) also
//!    passes, ending the linked entry in CANCELED.
//!
//! All tests are pure in-process; no network required.

use std::time::Duration;

use fxl_engine::ScenarioExecutor;
use fxl_model::{ExpectedResult, OrdStatus, RunStatus, Scenario, Step, StepAction};
use fxl_sim::{PaperSession, ResponderConfig};
use fxl_validate::ComplianceConfig;

fn scenario(steps: Vec<Step>) -> Scenario {
    Scenario {
        id: "scn-e2e".to_string(),
        name: "order round trip".to_string(),
        description: String::new(),
        config: Default::default(),
        sequence: steps,
    }
}

fn executor(responder: ResponderConfig) -> ScenarioExecutor<PaperSession> {
    ScenarioExecutor::standard(
        PaperSession::new("sess-e2e", responder),
        ComplianceConfig::wide_open(),
    )
}

// ---------------------------------------------------------------------------
// 1. Order + execution report within 50 ms → PASSED
// ---------------------------------------------------------------------------

#[tokio::test]
async fn order_acked_within_50ms_passes() {
    let mut ex = executor(ResponderConfig::ack_after(Duration::from_millis(50)));

    let result = ex
        .execute(&scenario(vec![
            Step::new(StepAction::SendNewOrder)
                .with_param("clOrdID", "e2e-1")
                .with_param("quantity", "100"),
            Step::new(StepAction::WaitExecutionReport)
                .with_param("msgType", "8")
                .with_param("150", "0")
                .with_timeout(Duration::from_millis(1000)),
        ]))
        .await;

    assert_eq!(result.status, RunStatus::Passed, "{:?}", result.failures);
    assert!(result.failures.is_empty());
}

// ---------------------------------------------------------------------------
// 2. The chain tracks the order through the matched report
// ---------------------------------------------------------------------------

#[tokio::test]
async fn matched_report_advances_the_lifecycle_tracker() {
    let mut ex = executor(ResponderConfig::ack_after(Duration::from_millis(10)));
    let tracker = ex.tracker();

    let result = ex
        .execute(&scenario(vec![
            Step::new(StepAction::SendNewOrder).with_param("clOrdID", "e2e-2"),
            Step::new(StepAction::WaitExecutionReport).with_param("150", "0"),
        ]))
        .await;

    assert_eq!(result.status, RunStatus::Passed, "{:?}", result.failures);
    let t = tracker.lock().unwrap();
    let rec = t.order("e2e-2").expect("order tracked");
    assert_eq!(rec.status, OrdStatus::New);
    assert_eq!(rec.cumulative_qty, 0.0);
}

#[tokio::test]
async fn scripted_fill_ends_the_order_filled() {
    // The fill trails the ack by well over one poll interval so the ack is
    // observable before the fill replaces it as the latest inbound message.
    let mut ex = executor(
        ResponderConfig::ack_after(Duration::from_millis(10))
            .with_fill(101.5, Duration::from_millis(250)),
    );
    let tracker = ex.tracker();

    let result = ex
        .execute(&scenario(vec![
            Step::new(StepAction::SendNewOrder)
                .with_param("clOrdID", "e2e-3")
                .with_param("quantity", "100"),
            Step::new(StepAction::WaitExecutionReport).with_param("150", "0"),
            Step::new(StepAction::WaitExecutionReport)
                .with_param("150", "2")
                .with_param("39", "2"),
        ]))
        .await;

    assert_eq!(result.status, RunStatus::Passed, "{:?}", result.failures);
    let t = tracker.lock().unwrap();
    let rec = t.order("e2e-3").expect("order tracked");
    assert_eq!(rec.status, OrdStatus::Filled);
    assert_eq!(rec.cumulative_qty, 100.0);
    assert!(rec.cumulative_qty <= rec.original_qty);
}

// ---------------------------------------------------------------------------
// 3. Cancel conversation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_conversation_passes_and_tracks_the_cancel() {
    let mut ex = executor(ResponderConfig::ack_only());
    let tracker = ex.tracker();

    let result = ex
        .execute(&scenario(vec![
            Step::new(StepAction::SendNewOrder).with_param("clOrdID", "ord-1"),
            Step::new(StepAction::WaitExecutionReport).with_param("150", "0"),
            Step::new(StepAction::CancelOrder)
                .with_param("clOrdID", "cxl-1")
                .with_param("origClOrdID", "ord-1"),
            Step::new(StepAction::WaitOrderCancelResponse).with_param("150", "4"),
        ]))
        .await;

    assert_eq!(result.status, RunStatus::Passed, "{:?}", result.failures);
    let t = tracker.lock().unwrap();
    assert_eq!(t.order("cxl-1").unwrap().status, OrdStatus::Canceled);
}

// ---------------------------------------------------------------------------
// 4. ExpectedResult verification on the send step itself
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_step_with_expected_result_verifies_the_response() {
    let mut ex = executor(ResponderConfig::ack_after(Duration::from_millis(10)));

    let result = ex
        .execute(&scenario(vec![Step::new(StepAction::SendNewOrder)
            .with_param("clOrdID", "e2e-4")
            .with_expected(
                ExpectedResult::of_type("8")
                    .with_field(150, "0")
                    .with_field(39, "0"),
            )]))
        .await;

    assert_eq!(result.status, RunStatus::Passed, "{:?}", result.failures);
}
