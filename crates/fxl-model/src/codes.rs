//! Enumerated FIX codes and harness-level enums.
//!
//! The char-backed enums round-trip through `from_char` / `as_char` and never
//! panic on unknown input; an out-of-range code is `None`, which the
//! exception-scenario validator turns into a finding.

use serde::{Deserialize, Serialize};

/// Message type strings (tag 35) the harness knows how to handle.
pub mod msg_type {
    pub const HEARTBEAT: &str = "0";
    pub const TEST_REQUEST: &str = "1";
    pub const RESEND_REQUEST: &str = "2";
    pub const SESSION_REJECT: &str = "3";
    pub const SEQUENCE_RESET: &str = "4";
    pub const LOGOUT: &str = "5";
    pub const EXECUTION_REPORT: &str = "8";
    pub const ORDER_CANCEL_REJECT: &str = "9";
    pub const LOGON: &str = "A";
    pub const NEW_ORDER_SINGLE: &str = "D";
    pub const ORDER_CANCEL_REQUEST: &str = "F";
    pub const ORDER_CANCEL_REPLACE_REQUEST: &str = "G";
    pub const ORDER_STATUS_REQUEST: &str = "H";

    /// All message types the harness supports. Dispatch over anything else
    /// is an explicit "unsupported type" outcome, never a silent pass.
    pub const SUPPORTED: &[&str] = &[
        HEARTBEAT,
        TEST_REQUEST,
        RESEND_REQUEST,
        SESSION_REJECT,
        SEQUENCE_RESET,
        LOGOUT,
        EXECUTION_REPORT,
        ORDER_CANCEL_REJECT,
        LOGON,
        NEW_ORDER_SINGLE,
        ORDER_CANCEL_REQUEST,
        ORDER_CANCEL_REPLACE_REQUEST,
        ORDER_STATUS_REQUEST,
    ];

    pub fn is_supported(t: &str) -> bool {
        SUPPORTED.contains(&t)
    }
}

/// Order side (tag 54).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
    BuyMinus,
    SellPlus,
}

impl Side {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '1' => Some(Self::Buy),
            '2' => Some(Self::Sell),
            '3' => Some(Self::BuyMinus),
            '4' => Some(Self::SellPlus),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Buy => '1',
            Self::Sell => '2',
            Self::BuyMinus => '3',
            Self::SellPlus => '4',
        }
    }
}

/// Order type (tag 40).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrdType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrdType {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '1' => Some(Self::Market),
            '2' => Some(Self::Limit),
            '3' => Some(Self::Stop),
            '4' => Some(Self::StopLimit),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Market => '1',
            Self::Limit => '2',
            Self::Stop => '3',
            Self::StopLimit => '4',
        }
    }

    /// Limit and stop orders must carry a positive price.
    pub fn requires_price(self) -> bool {
        matches!(self, Self::Limit | Self::Stop)
    }
}

/// Time in force (tag 59).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    Day,
    GoodTillCancel,
    ImmediateOrCancel,
    FillOrKill,
}

impl TimeInForce {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::Day),
            '1' => Some(Self::GoodTillCancel),
            '3' => Some(Self::ImmediateOrCancel),
            '4' => Some(Self::FillOrKill),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Day => '0',
            Self::GoodTillCancel => '1',
            Self::ImmediateOrCancel => '3',
            Self::FillOrKill => '4',
        }
    }
}

/// Order status (tag 39). The lifecycle tracker's transition table is keyed
/// on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrdStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Replaced,
    PendingCancel,
    Rejected,
    PendingReplace,
}

impl OrdStatus {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::New),
            '1' => Some(Self::PartiallyFilled),
            '2' => Some(Self::Filled),
            '4' => Some(Self::Canceled),
            '5' => Some(Self::Replaced),
            '6' => Some(Self::PendingCancel),
            '8' => Some(Self::Rejected),
            'E' => Some(Self::PendingReplace),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::New => '0',
            Self::PartiallyFilled => '1',
            Self::Filled => '2',
            Self::Canceled => '4',
            Self::Replaced => '5',
            Self::PendingCancel => '6',
            Self::Rejected => '8',
            Self::PendingReplace => 'E',
        }
    }

    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Rejected | Self::Replaced
        )
    }
}

impl std::fmt::Display for OrdStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Execution type (tag 150).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecType {
    New,
    PartialFill,
    Fill,
    Canceled,
    Replaced,
    PendingCancel,
    Rejected,
    PendingReplace,
}

impl ExecType {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::New),
            '1' => Some(Self::PartialFill),
            '2' => Some(Self::Fill),
            '4' => Some(Self::Canceled),
            '5' => Some(Self::Replaced),
            '6' => Some(Self::PendingCancel),
            '8' => Some(Self::Rejected),
            'E' => Some(Self::PendingReplace),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::New => '0',
            Self::PartialFill => '1',
            Self::Fill => '2',
            Self::Canceled => '4',
            Self::Replaced => '5',
            Self::PendingCancel => '6',
            Self::Rejected => '8',
            Self::PendingReplace => 'E',
        }
    }
}

/// Which side of the session the harness plays in a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    Initiator,
    Acceptor,
}

impl Default for SessionRole {
    fn default() -> Self {
        Self::Initiator
    }
}

/// Expected login state of a session, asserted by verify-session-state steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginState {
    LoggedOn,
    Disconnected,
}
