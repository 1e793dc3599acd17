//! Trading-session simulator boundary.
//!
//! The executor and wait engine consume sessions exclusively through
//! [`SessionSimulator`]; nothing in the core ever reaches into a transport
//! engine's internal session registry. [`PaperSession`] is the deterministic
//! in-process implementation used by the harness itself.

mod paper;

pub use paper::{FillPlan, PaperSession, ResponderConfig};

use fxl_model::FixMessage;

/// Login state of a simulated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    LoggedOn,
    Disconnected,
}

/// Transport-level failures. Everything else a session does wrong surfaces
/// as message content, not as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatorError {
    /// `send_message` with no active session.
    NoActiveSession,
}

impl std::fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveSession => write!(f, "no active session"),
        }
    }
}

impl std::error::Error for SimulatorError {}

/// The narrow interface the scenario executor drives a session through.
pub trait SessionSimulator: Send + Sync {
    fn start(&self) -> Result<(), SimulatorError>;
    fn stop(&self);
    fn send_message(&self, message: FixMessage) -> Result<(), SimulatorError>;
    /// Most recent inbound message, or `None` when nothing has arrived.
    fn last_received_message(&self) -> Option<FixMessage>;
    fn session_id(&self) -> String;
    fn session_state(&self) -> SessionState;
}
