//! Shared value types for the fixlab conformance harness.
//!
//! Everything here is plain data: messages, scenarios, validation verdicts
//! and run records. No IO, no runtime state; the engine crates own those.

pub mod codes;
pub mod message;
pub mod run;
pub mod scenario;
pub mod tags;
pub mod validation;

pub use codes::{msg_type, ExecType, LoginState, OrdStatus, OrdType, SessionRole, Side, TimeInForce};
pub use message::{format_qty, FixMessage};
pub use run::{RunResult, RunStatus};
pub use scenario::{ExpectedResult, Scenario, ScenarioConfig, Step, StepAction};
pub use validation::{Severity, ValidationResult};
