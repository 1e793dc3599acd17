//! Scenario executor.
//!
//! # Design
//!
//! Steps run strictly sequentially: session conversations are stateful and
//! reordering is not semantically safe. Each step resolves to a handler by
//! its action tag; an unrecognized tag is recorded as a failure, never
//! silently skipped. The first failing step turns the run FAILED and stops
//! the walk; exhausting all steps yields PASSED.
//!
//! Outbound messages are validated through the chain before they are sent
//! (which is also what feeds the order lifecycle tracker); matched inbound
//! order-flow responses are validated the same way. Timeout failures carry
//! distinguishable wording ("no execution report received within timeout")
//! so a silent counterparty and a defective one read differently in the run
//! record. Nothing here panics or exits; every failure is data on the
//! [`RunResult`].

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use fxl_model::{
    msg_type, tags, ExpectedResult, FixMessage, LoginState, OrdType, RunResult, RunStatus,
    Scenario, Side, Step, StepAction,
};
use fxl_sim::{SessionSimulator, SessionState};
use fxl_validate::{
    ComplianceConfig, ComplianceRuleSet, SharedTracker, ValidationChain, ValidationContext,
};

use crate::wait::{wait_for, WaitOutcome};

// ---------------------------------------------------------------------------
// ExecutorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Default timeout for wait-type steps and response verification.
    pub default_step_timeout: Duration,
    /// Login waits get a longer default.
    pub login_timeout: Duration,
    pub sender_comp_id: String,
    pub target_comp_id: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_step_timeout: Duration::from_secs(5),
            login_timeout: Duration::from_secs(10),
            sender_comp_id: "HARNESS".to_string(),
            target_comp_id: "SIM".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScenarioExecutor
// ---------------------------------------------------------------------------

type StepOutcome = Result<(), Vec<String>>;

pub struct ScenarioExecutor<S: SessionSimulator> {
    sim: S,
    chain: ValidationChain,
    tracker: SharedTracker,
    config: ExecutorConfig,
    outbound_seq: u64,
}

impl<S: SessionSimulator> ScenarioExecutor<S> {
    pub fn new(sim: S, chain: ValidationChain, tracker: SharedTracker) -> Self {
        Self {
            sim,
            chain,
            tracker,
            config: ExecutorConfig::default(),
            outbound_seq: 0,
        }
    }

    /// Standard six-stage chain over a fresh tracker.
    pub fn standard(sim: S, compliance: ComplianceConfig) -> Self {
        let tracker: SharedTracker = Default::default();
        let chain =
            ValidationChain::standard(tracker.clone(), ComplianceRuleSet::standard(compliance));
        Self::new(sim, chain, tracker)
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// The run's lifecycle tracker, shared with the validation chain.
    pub fn tracker(&self) -> SharedTracker {
        self.tracker.clone()
    }

    // -- run loop ------------------------------------------------------------

    pub async fn execute(&mut self, scenario: &Scenario) -> RunResult {
        info!(scenario_id = %scenario.id, name = %scenario.name, "starting scenario run");
        let started_at = Utc::now();
        let mut failures: Vec<String> = Vec::new();

        // First outbound message carries the configured initial seq num.
        self.outbound_seq = scenario.config.initial_seq_num.saturating_sub(1);

        if let Err(e) = self.sim.start() {
            failures.push(format!("failed to start simulator: {e}"));
        } else {
            debug!(role = ?scenario.config.role, session_id = %self.sim.session_id(), "session up");

            // Gate on the configured login state before any step runs.
            if let Some(expected) = scenario.config.login_state {
                if let Err(mut gate_failures) =
                    check_session_state(self.sim.session_state(), expected)
                {
                    failures.append(&mut gate_failures);
                }
            }

            if failures.is_empty() {
                for step in &scenario.sequence {
                    debug!(action = %step.action, "executing step");
                    if let Err(mut step_failures) = self.execute_step(step).await {
                        warn!(action = %step.action, failures = ?step_failures, "step failed");
                        failures.append(&mut step_failures);
                        break;
                    }
                }
            }
            self.sim.stop();
        }

        let status = if failures.is_empty() {
            RunStatus::Passed
        } else {
            RunStatus::Failed
        };
        info!(scenario_id = %scenario.id, ?status, "scenario run finished");

        RunResult {
            scenario_id: scenario.id.clone(),
            status,
            failures,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn execute_step(&mut self, step: &Step) -> StepOutcome {
        match &step.action {
            StepAction::WaitLogin => self.wait_login(step).await,
            StepAction::SendHeartbeat => self.send_heartbeat(step).await,
            StepAction::SendTestRequest => self.send_test_request(step).await,
            StepAction::WaitMessage => self.wait_message(step).await,
            StepAction::VerifySessionState => self.verify_session_state(step),
            StepAction::SendNewOrder => self.send_new_order(step).await,
            StepAction::CancelOrder => self.cancel_order(step).await,
            StepAction::ModifyOrder => self.modify_order(step).await,
            StepAction::QueryOrderStatus => self.query_order_status(step).await,
            StepAction::WaitExecutionReport => {
                self.wait_order_response(step, &[msg_type::EXECUTION_REPORT], "execution report")
                    .await
            }
            StepAction::WaitOrderCancelResponse => {
                self.wait_order_response(
                    step,
                    &[msg_type::EXECUTION_REPORT, msg_type::ORDER_CANCEL_REJECT],
                    "order cancel response",
                )
                .await
            }
            StepAction::WaitOrderModifyResponse => {
                self.wait_order_response(
                    step,
                    &[msg_type::EXECUTION_REPORT, msg_type::ORDER_CANCEL_REJECT],
                    "order modify response",
                )
                .await
            }
            StepAction::Unknown(tag) => Err(vec![format!("unknown action: {tag}")]),
        }
    }

    // -- shared helpers ------------------------------------------------------

    fn step_timeout(&self, step: &Step) -> Duration {
        step.timeout().unwrap_or(self.config.default_step_timeout)
    }

    /// Step parameters double as scenario metadata for the validators (the
    /// fault-scenario selector and its inputs travel this way).
    fn context_for(&self, step: &Step) -> ValidationContext {
        let mut ctx = ValidationContext::new(self.sim.session_id());
        for (key, value) in &step.parameters {
            ctx = ctx.with_metadata(key, value.clone());
        }
        ctx
    }

    /// Run the chain and fold invalid results into failure strings.
    fn run_chain(&self, message: &FixMessage, ctx: &ValidationContext) -> StepOutcome {
        let failures: Vec<String> = self
            .chain
            .validate(message, ctx)
            .into_iter()
            .filter(|r| !r.valid)
            .map(|r| {
                if r.details.is_empty() {
                    r.message
                } else {
                    format!("{}: {}", r.message, r.details.join("; "))
                }
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    /// Stamp an outbound message, validate it through the chain, send it,
    /// then verify the expected response if the step declares one.
    async fn send_and_verify(&mut self, mut message: FixMessage, step: &Step) -> StepOutcome {
        self.outbound_seq += 1;
        message.stamp_session(
            &self.config.sender_comp_id,
            &self.config.target_comp_id,
            self.outbound_seq,
            Utc::now(),
        );

        self.run_chain(&message, &self.context_for(step))?;

        let description = message.msg_type().unwrap_or("?").to_string();
        self.sim
            .send_message(message)
            .map_err(|e| vec![format!("failed to send message type {description}: {e}")])?;

        if let Some(expected) = &step.expected {
            self.verify_response(expected, step).await?;
        }
        Ok(())
    }

    /// Wait for a message satisfying the expectation, then validate it
    /// through the chain with the expectation in context.
    async fn verify_response(&self, expected: &ExpectedResult, step: &Step) -> StepOutcome {
        let timeout = self.step_timeout(step);

        if let Some(state) = expected.session_state {
            check_session_state(self.sim.session_state(), state)?;
        }

        let matched = wait_for(timeout, || {
            self.sim
                .last_received_message()
                .filter(|m| matches_expected(m, expected))
        })
        .await;

        match matched {
            WaitOutcome::Matched(message) => {
                let ctx = self
                    .context_for(step)
                    .with_expected(expected_message(expected));
                self.run_chain(&message, &ctx)
            }
            WaitOutcome::TimedOut => Err(vec![format!(
                "no matching response received within timeout ({} ms)",
                timeout.as_millis()
            )]),
        }
    }

    // -- session steps -------------------------------------------------------

    async fn wait_login(&self, step: &Step) -> StepOutcome {
        let timeout = step.timeout().unwrap_or(self.config.login_timeout);
        let outcome = wait_for(timeout, || {
            (self.sim.session_state() == SessionState::LoggedOn).then_some(())
        })
        .await;

        match outcome {
            WaitOutcome::Matched(()) => Ok(()),
            WaitOutcome::TimedOut => Err(vec![format!(
                "login timeout after {} ms",
                timeout.as_millis()
            )]),
        }
    }

    async fn send_heartbeat(&mut self, step: &Step) -> StepOutcome {
        let message = FixMessage::heartbeat(step.parameters.get("testReqID").map(String::as_str));
        self.send_and_verify(message, step).await
    }

    async fn send_test_request(&mut self, step: &Step) -> StepOutcome {
        let generated;
        let id = match step.parameters.get("testReqID") {
            Some(id) => id.as_str(),
            None => {
                generated = format!("TEST_{}", Utc::now().timestamp_millis());
                &generated
            }
        };
        let message = FixMessage::test_request(id);
        self.send_and_verify(message, step).await
    }

    async fn wait_message(&self, step: &Step) -> StepOutcome {
        let timeout = self.step_timeout(step);
        let outcome = wait_for(timeout, || {
            self.sim
                .last_received_message()
                .filter(|m| matches_params(m, &step.parameters))
        })
        .await;

        match outcome {
            WaitOutcome::Matched(_) => Ok(()),
            WaitOutcome::TimedOut => Err(vec![format!(
                "no matching message received within timeout ({} ms)",
                timeout.as_millis()
            )]),
        }
    }

    fn verify_session_state(&self, step: &Step) -> StepOutcome {
        let Some(expected) = step.parameters.get("expectedState") else {
            return Err(vec!["missing expectedState parameter".to_string()]);
        };

        let expected_state = match expected.to_uppercase().as_str() {
            "LOGGED_ON" | "LOGGED_IN" => LoginState::LoggedOn,
            "DISCONNECTED" => LoginState::Disconnected,
            other => return Err(vec![format!("unknown session state: {other}")]),
        };

        check_session_state(self.sim.session_state(), expected_state)
    }

    // -- order steps ---------------------------------------------------------

    async fn send_new_order(&mut self, step: &Step) -> StepOutcome {
        let params = &step.parameters;
        let cl_ord_id = params
            .get("clOrdID")
            .cloned()
            .unwrap_or_else(|| format!("ORDER_{}", Utc::now().timestamp_millis()));
        let symbol = params.get("symbol").map(String::as_str).unwrap_or("AAPL");
        let side = parse_side(params.get("side"))?;
        let ord_type = parse_ord_type(params.get("ordType"))?;
        let quantity = parse_qty(params.get("quantity"), 100.0)?;

        let mut message = FixMessage::new_order_single(
            &cl_ord_id,
            symbol,
            side,
            ord_type,
            quantity,
            Utc::now(),
        );
        if let Some(price) = params.get("price") {
            let price: f64 = price
                .parse()
                .map_err(|_| vec![format!("invalid price parameter: {price}")])?;
            message = message.with_price(price);
        }
        if let Some(tif) = params.get("timeInForce") {
            // Passed through raw so fault scenarios can inject bad codes.
            message = message.with(tags::TIME_IN_FORCE, tif.clone());
        }

        self.send_and_verify(message, step).await
    }

    async fn cancel_order(&mut self, step: &Step) -> StepOutcome {
        let params = &step.parameters;
        let Some(orig) = params.get("origClOrdID") else {
            return Err(vec![
                "missing origClOrdID parameter for cancel order".to_string()
            ]);
        };
        let cl_ord_id = params
            .get("clOrdID")
            .cloned()
            .unwrap_or_else(|| format!("CANCEL_{}", Utc::now().timestamp_millis()));
        let symbol = params.get("symbol").map(String::as_str).unwrap_or("AAPL");
        let side = parse_side(params.get("side"))?;
        let quantity = parse_qty(params.get("quantity"), 100.0)?;

        let message = FixMessage::order_cancel_request(
            &cl_ord_id,
            orig,
            symbol,
            side,
            quantity,
            Utc::now(),
        );
        self.send_and_verify(message, step).await
    }

    async fn modify_order(&mut self, step: &Step) -> StepOutcome {
        let params = &step.parameters;
        let Some(orig) = params.get("origClOrdID") else {
            return Err(vec![
                "missing origClOrdID parameter for modify order".to_string()
            ]);
        };
        let cl_ord_id = params
            .get("clOrdID")
            .cloned()
            .unwrap_or_else(|| format!("MODIFY_{}", Utc::now().timestamp_millis()));
        let symbol = params.get("symbol").map(String::as_str).unwrap_or("AAPL");
        let side = parse_side(params.get("side"))?;
        let quantity = parse_qty(params.get("quantity"), 100.0)?;

        let mut message = FixMessage::order_cancel_replace_request(
            &cl_ord_id,
            orig,
            symbol,
            side,
            quantity,
            Utc::now(),
        );
        if let Some(price) = params.get("price") {
            let price: f64 = price
                .parse()
                .map_err(|_| vec![format!("invalid price parameter: {price}")])?;
            message = message.with_price(price);
        }

        self.send_and_verify(message, step).await
    }

    async fn query_order_status(&mut self, step: &Step) -> StepOutcome {
        let params = &step.parameters;
        let Some(order_id) = params.get("orderID") else {
            return Err(vec![
                "missing orderID parameter for order status query".to_string()
            ]);
        };
        let symbol = params.get("symbol").map(String::as_str).unwrap_or("AAPL");
        let side = parse_side(params.get("side"))?;

        let message = FixMessage::order_status_request(order_id, symbol, side);
        self.send_and_verify(message, step).await
    }

    /// Shared wait handler for execution reports and cancel/modify responses.
    /// On a match the message is pushed through the validation chain, which
    /// is also what advances the lifecycle tracker.
    async fn wait_order_response(
        &self,
        step: &Step,
        accepted_types: &[&str],
        description: &str,
    ) -> StepOutcome {
        let timeout = self.step_timeout(step);
        let outcome = wait_for(timeout, || {
            self.sim.last_received_message().filter(|m| {
                m.msg_type().is_some_and(|t| accepted_types.contains(&t))
                    && matches_params(m, &step.parameters)
            })
        })
        .await;

        match outcome {
            WaitOutcome::Matched(message) => {
                info!(msg_type = ?message.msg_type(), "{description} received");
                self.run_chain(&message, &self.context_for(step))
            }
            WaitOutcome::TimedOut => Err(vec![format!("no {description} received within timeout")]),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching helpers
// ---------------------------------------------------------------------------

fn check_session_state(actual: SessionState, expected: LoginState) -> StepOutcome {
    let ok = match expected {
        LoginState::LoggedOn => actual == SessionState::LoggedOn,
        LoginState::Disconnected => actual != SessionState::LoggedOn,
    };
    if ok {
        Ok(())
    } else {
        Err(vec![format!(
            "expected session state {expected:?}, but session is {actual:?}"
        )])
    }
}

/// Match a message against wait-step parameters: an optional `msgType` key
/// plus numeric field tags. Non-numeric keys other than `msgType` are not
/// field expectations and are skipped.
fn matches_params(
    message: &FixMessage,
    params: &std::collections::BTreeMap<String, String>,
) -> bool {
    for (key, expected) in params {
        if key == "msgType" {
            if message.msg_type() != Some(expected.as_str()) {
                return false;
            }
            continue;
        }
        let Ok(tag) = key.parse::<u32>() else {
            continue;
        };
        if message.get(tag) != Some(expected.as_str()) {
            return false;
        }
    }
    true
}

/// Match a message against an [`ExpectedResult`].
fn matches_expected(message: &FixMessage, expected: &ExpectedResult) -> bool {
    if let Some(t) = &expected.message_type {
        if message.msg_type() != Some(t.as_str()) {
            return false;
        }
    }
    for (key, value) in &expected.fields {
        let Ok(tag) = key.parse::<u32>() else {
            warn!(tag = %key, "ignoring unparseable field tag in expectation");
            continue;
        };
        if message.get(tag) != Some(value.as_str()) {
            return false;
        }
    }
    true
}

/// Materialize an [`ExpectedResult`] as a message for the field-value
/// validator's section-wise comparison.
fn expected_message(expected: &ExpectedResult) -> FixMessage {
    let mut m = match &expected.message_type {
        Some(t) => FixMessage::of_type(t),
        None => FixMessage::default(),
    };
    for (key, value) in &expected.fields {
        if let Ok(tag) = key.parse::<u32>() {
            m.set(tag, value.clone());
        }
    }
    m
}

fn parse_side(param: Option<&String>) -> Result<Side, Vec<String>> {
    let raw = param.map(String::as_str).unwrap_or("1");
    raw.chars()
        .next()
        .and_then(Side::from_char)
        .ok_or_else(|| vec![format!("invalid side parameter: {raw}")])
}

fn parse_ord_type(param: Option<&String>) -> Result<OrdType, Vec<String>> {
    let raw = param.map(String::as_str).unwrap_or("1");
    raw.chars()
        .next()
        .and_then(OrdType::from_char)
        .ok_or_else(|| vec![format!("invalid ordType parameter: {raw}")])
}

fn parse_qty(param: Option<&String>, default: f64) -> Result<f64, Vec<String>> {
    match param {
        Some(raw) => raw
            .parse()
            .map_err(|_| vec![format!("invalid quantity parameter: {raw}")]),
        None => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
