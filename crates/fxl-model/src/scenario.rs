//! Declarative test scenarios.
//!
//! A scenario is an ordered list of steps with a small session configuration.
//! It is immutable once handed to the executor; the executor copies nothing
//! back into it.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codes::{LoginState, SessionRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: ScenarioConfig,
    pub sequence: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub role: SessionRole,
    #[serde(default = "default_initial_seq_num")]
    pub initial_seq_num: u64,
    /// Login state the session is expected to reach before order flow.
    #[serde(default)]
    pub login_state: Option<LoginState>,
}

fn default_initial_seq_num() -> u64 {
    1
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            role: SessionRole::Initiator,
            initial_seq_num: 1,
            login_state: Some(LoginState::LoggedOn),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub action: StepAction,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    /// 0 means "use the executor's default for this step kind".
    #[serde(default)]
    pub timeout_ms: u64,
    #[serde(default)]
    pub expected: Option<ExpectedResult>,
}

impl Step {
    pub fn new(action: StepAction) -> Self {
        Self {
            action,
            parameters: BTreeMap::new(),
            timeout_ms: 0,
            expected: None,
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_expected(mut self, expected: ExpectedResult) -> Self {
        self.expected = Some(expected);
        self
    }

    /// Configured timeout, or `None` when the step defers to the default.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Step action tags. Unrecognized tags deserialize into `Unknown` so the
/// executor can record them as failures instead of dropping them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepAction {
    WaitLogin,
    SendHeartbeat,
    SendTestRequest,
    WaitMessage,
    VerifySessionState,
    SendNewOrder,
    CancelOrder,
    ModifyOrder,
    QueryOrderStatus,
    WaitExecutionReport,
    WaitOrderCancelResponse,
    WaitOrderModifyResponse,
    Unknown(String),
}

impl From<String> for StepAction {
    fn from(s: String) -> Self {
        match s.as_str() {
            "WAIT_LOGIN" => Self::WaitLogin,
            "SEND_HEARTBEAT" => Self::SendHeartbeat,
            "SEND_TEST_REQUEST" => Self::SendTestRequest,
            "WAIT_MESSAGE" => Self::WaitMessage,
            "VERIFY_SESSION_STATE" => Self::VerifySessionState,
            "SEND_NEW_ORDER" => Self::SendNewOrder,
            "CANCEL_ORDER" => Self::CancelOrder,
            "MODIFY_ORDER" => Self::ModifyOrder,
            "QUERY_ORDER_STATUS" => Self::QueryOrderStatus,
            "WAIT_EXECUTION_REPORT" => Self::WaitExecutionReport,
            "WAIT_ORDER_CANCEL_RESPONSE" => Self::WaitOrderCancelResponse,
            "WAIT_ORDER_MODIFY_RESPONSE" => Self::WaitOrderModifyResponse,
            _ => Self::Unknown(s),
        }
    }
}

impl From<StepAction> for String {
    fn from(a: StepAction) -> Self {
        match a {
            StepAction::WaitLogin => "WAIT_LOGIN".to_string(),
            StepAction::SendHeartbeat => "SEND_HEARTBEAT".to_string(),
            StepAction::SendTestRequest => "SEND_TEST_REQUEST".to_string(),
            StepAction::WaitMessage => "WAIT_MESSAGE".to_string(),
            StepAction::VerifySessionState => "VERIFY_SESSION_STATE".to_string(),
            StepAction::SendNewOrder => "SEND_NEW_ORDER".to_string(),
            StepAction::CancelOrder => "CANCEL_ORDER".to_string(),
            StepAction::ModifyOrder => "MODIFY_ORDER".to_string(),
            StepAction::QueryOrderStatus => "QUERY_ORDER_STATUS".to_string(),
            StepAction::WaitExecutionReport => "WAIT_EXECUTION_REPORT".to_string(),
            StepAction::WaitOrderCancelResponse => "WAIT_ORDER_CANCEL_RESPONSE".to_string(),
            StepAction::WaitOrderModifyResponse => "WAIT_ORDER_MODIFY_RESPONSE".to_string(),
            StepAction::Unknown(s) => s,
        }
    }
}

// Display uses the scenario-file spelling so log lines and failure messages
// match what the author wrote.
impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from(self.clone()))
    }
}

/// What a send-type step expects back, verified through the wait engine and
/// the validation chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpectedResult {
    #[serde(default)]
    pub message_type: Option<String>,
    /// Field tag (as a string key, scenario files are JSON) → expected value.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub session_state: Option<LoginState>,
}

impl ExpectedResult {
    pub fn of_type(message_type: &str) -> Self {
        Self {
            message_type: Some(message_type.to_string()),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, tag: u32, value: impl Into<String>) -> Self {
        self.fields.insert(tag.to_string(), value.into());
        self
    }
}
