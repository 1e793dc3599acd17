//! Scenario: cancel/replace conversation with quantity discipline.
//!
//! # Invariants under test
//!
//! 1. A replace that shrinks quantity passes end to end and lands the linked
//!    entry in REPLACED.
//! 2. A replace that grows quantity fails the run at the send step ("cannot
//!    increase order quantity"), before anything reaches the session.
//! 3. A fault-scenario step parameter routes the matched response through the
//!    named fault probe rather than the default sweep.

use std::time::Duration;

use fxl_engine::ScenarioExecutor;
use fxl_model::{OrdStatus, RunStatus, Scenario, Step, StepAction};
use fxl_sim::{PaperSession, ResponderConfig, SessionSimulator};
use fxl_validate::ComplianceConfig;

fn scenario(steps: Vec<Step>) -> Scenario {
    Scenario {
        id: "scn-replace".to_string(),
        name: "replace flow".to_string(),
        description: String::new(),
        config: Default::default(),
        sequence: steps,
    }
}

fn executor(name: &str) -> ScenarioExecutor<PaperSession> {
    ScenarioExecutor::standard(
        PaperSession::new(name, ResponderConfig::ack_only()),
        ComplianceConfig::wide_open(),
    )
}

#[tokio::test]
async fn shrinking_replace_passes_and_ends_replaced() {
    let mut ex = executor("sess-rpl-1");
    let tracker = ex.tracker();

    let result = ex
        .execute(&scenario(vec![
            Step::new(StepAction::SendNewOrder)
                .with_param("clOrdID", "ord-1")
                .with_param("quantity", "100"),
            Step::new(StepAction::WaitExecutionReport).with_param("150", "0"),
            Step::new(StepAction::ModifyOrder)
                .with_param("clOrdID", "mod-1")
                .with_param("origClOrdID", "ord-1")
                .with_param("quantity", "60"),
            Step::new(StepAction::WaitOrderModifyResponse)
                .with_param("150", "5")
                .with_timeout(Duration::from_millis(1000)),
        ]))
        .await;

    assert_eq!(result.status, RunStatus::Passed, "{:?}", result.failures);
    let t = tracker.lock().unwrap();
    let rec = t.order("mod-1").unwrap();
    assert_eq!(rec.status, OrdStatus::Replaced);
    assert_eq!(rec.modified_qty, Some(60.0));
}

#[tokio::test]
async fn growing_replace_fails_before_reaching_the_session() {
    let sim = PaperSession::new("sess-rpl-2", ResponderConfig::ack_only());
    let probe = sim.clone();
    let mut ex = ScenarioExecutor::standard(sim, ComplianceConfig::wide_open());

    let result = ex
        .execute(&scenario(vec![
            Step::new(StepAction::SendNewOrder)
                .with_param("clOrdID", "ord-2")
                .with_param("quantity", "100"),
            Step::new(StepAction::ModifyOrder)
                .with_param("clOrdID", "mod-2")
                .with_param("origClOrdID", "ord-2")
                .with_param("quantity", "150"),
        ]))
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result
        .failures
        .iter()
        .any(|f| f.contains("cannot increase order quantity")));

    // The rejected replace was never sent: the last inbound message is still
    // the new-order ack, not a replace ack.
    let last = probe.last_received_message().unwrap();
    assert_eq!(last.get(150), Some("0"));
}

#[tokio::test]
async fn fault_scenario_parameter_selects_the_named_probe() {
    let mut ex = executor("sess-rpl-3");

    // The out-of-sequence probe compares the response's MsgSeqNum against the
    // expectation; the paper session's first outbound message is seq 1, so an
    // expectation of 99 must fail the step.
    let result = ex
        .execute(&scenario(vec![
            Step::new(StepAction::SendNewOrder).with_param("clOrdID", "ord-3"),
            Step::new(StepAction::WaitExecutionReport)
                .with_param("150", "0")
                .with_param("exception_scenario", "OUT_OF_SEQUENCE")
                .with_param("expected_seq_num", "99"),
        ]))
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result
        .failures
        .iter()
        .any(|f| f.contains("Out-of-sequence message")));
}
