//! Fault-injection (exception scenario) validation.
//!
//! With no scenario selected in the context metadata, this stage runs a
//! structural sweep: completeness, field-type coercibility, enumerated-value
//! ranges and numeric ranges. A named scenario narrows the stage to the one
//! probe it names, so a fault-injection test asserts exactly the defect it
//! injected.

use fxl_model::{
    msg_type, tags, FixMessage, OrdType, Severity, Side, TimeInForce, ValidationResult,
};

use crate::chain::{ValidationContext, Validator};
use crate::syntax::required_body_fields;

/// Context-metadata key that selects a named fault scenario.
pub const SCENARIO_METADATA_KEY: &str = "exception_scenario";

/// Metadata key the out-of-sequence scenario compares MsgSeqNum against.
pub const EXPECTED_SEQ_NUM_KEY: &str = "expected_seq_num";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultScenario {
    MalformedMessage,
    OutOfSequence,
    DuplicateMessage,
    InvalidChecksum,
    MissingRequiredFields,
    InvalidDataTypes,
    EnumOutOfRange,
}

impl FaultScenario {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "MALFORMED_MESSAGE" => Some(Self::MalformedMessage),
            "OUT_OF_SEQUENCE" => Some(Self::OutOfSequence),
            "DUPLICATE_MESSAGE" => Some(Self::DuplicateMessage),
            "INVALID_CHECKSUM" => Some(Self::InvalidChecksum),
            "MISSING_REQUIRED_FIELDS" => Some(Self::MissingRequiredFields),
            "INVALID_DATA_TYPES" => Some(Self::InvalidDataTypes),
            "ENUM_OUT_OF_RANGE" => Some(Self::EnumOutOfRange),
            _ => None,
        }
    }
}

/// Priority 5.
pub struct ExceptionScenarioValidator;

impl ExceptionScenarioValidator {
    pub fn new() -> Self {
        Self
    }

    // -- probes --------------------------------------------------------------

    fn check_completeness(message: &FixMessage, details: &mut Vec<String>) {
        let complete = message.header.contains_key(&tags::MSG_TYPE)
            && message.header.contains_key(&tags::SENDER_COMP_ID)
            && message.header.contains_key(&tags::TARGET_COMP_ID)
            && message.header.contains_key(&tags::MSG_SEQ_NUM)
            && message.trailer.contains_key(&tags::CHECK_SUM);
        if !complete {
            details.push("Message is incomplete or malformed".to_string());
        }
    }

    fn check_sequence(message: &FixMessage, context: &ValidationContext, details: &mut Vec<String>) {
        let Some(expected) = context.metadata.get(EXPECTED_SEQ_NUM_KEY) else {
            return;
        };
        match message.header.get(&tags::MSG_SEQ_NUM) {
            Some(actual) if actual != expected => details.push(format!(
                "Out-of-sequence message: expected seq num {expected}, got {actual}"
            )),
            None => details.push("Out-of-sequence check: MsgSeqNum missing".to_string()),
            Some(_) => {}
        }
    }

    fn check_duplicate(message: &FixMessage, details: &mut Vec<String>) {
        if message.header.get(&tags::POSS_DUP_FLAG).map(String::as_str) == Some("Y")
            && !message.header.contains_key(&tags::ORIG_SENDING_TIME)
        {
            details.push(
                "Possible duplicate without OrigSendingTime(122)".to_string(),
            );
        }
    }

    fn check_checksum(message: &FixMessage, details: &mut Vec<String>) {
        match message.trailer.get(&tags::CHECK_SUM) {
            Some(declared) => {
                let computed = message.compute_checksum();
                if *declared != computed {
                    details.push(format!(
                        "Checksum mismatch: declared={declared}, computed={computed}"
                    ));
                }
            }
            None => details.push(format!("Missing CheckSum({}) in trailer", tags::CHECK_SUM)),
        }
    }

    fn check_required_fields(message: &FixMessage, details: &mut Vec<String>) {
        let Some(t) = message.msg_type() else {
            details.push("MsgType missing; required-field check impossible".to_string());
            return;
        };
        if let Some(required) = required_body_fields(t) {
            for (tag, name) in required {
                if !message.body.contains_key(tag) {
                    details.push(format!("Missing required field {name}({tag})"));
                }
            }
        }
    }

    fn check_field_types(message: &FixMessage, details: &mut Vec<String>) {
        let numeric: &[(u32, &str)] = match message.msg_type() {
            Some(msg_type::NEW_ORDER_SINGLE) => &[(tags::ORDER_QTY, "OrderQty"), (tags::PRICE, "Price")],
            Some(msg_type::EXECUTION_REPORT) => {
                &[(tags::LAST_SHARES, "LastShares"), (tags::LAST_PX, "LastPx")]
            }
            _ => &[],
        };
        let single_char: &[(u32, &str)] = match message.msg_type() {
            Some(msg_type::NEW_ORDER_SINGLE) => &[(tags::SIDE, "Side"), (tags::ORD_TYPE, "OrdType")],
            Some(msg_type::EXECUTION_REPORT) => {
                &[(tags::EXEC_TYPE, "ExecType"), (tags::ORD_STATUS, "OrdStatus")]
            }
            _ => &[],
        };

        for (tag, name) in numeric {
            if let Some(Err(raw)) = message.get_f64(*tag) {
                details.push(format!("Invalid numeric value for {name}: {raw}"));
            }
        }
        for (tag, name) in single_char {
            if let Some(Err(raw)) = message.get_char(*tag) {
                details.push(format!("Invalid char value for {name}: {raw}"));
            }
        }
    }

    fn check_enum_values(message: &FixMessage, details: &mut Vec<String>) {
        if let Some(Ok(c)) = message.get_char(tags::SIDE) {
            if Side::from_char(c).is_none() {
                details.push(format!("Invalid Side value: {c}"));
            }
        }
        if let Some(Ok(c)) = message.get_char(tags::ORD_TYPE) {
            if OrdType::from_char(c).is_none() {
                details.push(format!("Invalid OrdType value: {c}"));
            }
        }
        if let Some(Ok(c)) = message.get_char(tags::TIME_IN_FORCE) {
            if TimeInForce::from_char(c).is_none() {
                details.push(format!("Invalid TimeInForce value: {c}"));
            }
        }
    }

    fn check_numeric_ranges(message: &FixMessage, details: &mut Vec<String>) {
        if let Some(Ok(qty)) = message.get_f64(tags::ORDER_QTY) {
            if qty <= 0.0 {
                details.push(format!("OrderQty must be positive: {qty}"));
            }
        }
        if let Some(Ok(price)) = message.get_f64(tags::PRICE) {
            if price <= 0.0 {
                details.push(format!("Price must be positive: {price}"));
            }
        }
        if let Some(Ok(last_shares)) = message.get_f64(tags::LAST_SHARES) {
            if last_shares < 0.0 {
                details.push(format!("LastShares must be non-negative: {last_shares}"));
            }
        }
    }

    /// The default sweep: everything, in structural → type → range order.
    fn default_sweep(
        message: &FixMessage,
        context: &ValidationContext,
        details: &mut Vec<String>,
    ) {
        Self::check_completeness(message, details);
        Self::check_sequence(message, context, details);
        Self::check_field_types(message, details);
        Self::check_enum_values(message, details);
        Self::check_numeric_ranges(message, details);
    }
}

impl Default for ExceptionScenarioValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for ExceptionScenarioValidator {
    fn validate(&self, message: &FixMessage, context: &ValidationContext) -> ValidationResult {
        let mut details = Vec::new();

        let scenario = context
            .metadata
            .get(SCENARIO_METADATA_KEY)
            .and_then(|name| FaultScenario::from_name(name));

        let severity = match scenario {
            Some(FaultScenario::MalformedMessage) => {
                Self::check_completeness(message, &mut details);
                Severity::Semantic
            }
            Some(FaultScenario::OutOfSequence) => {
                Self::check_sequence(message, context, &mut details);
                Severity::Timing
            }
            Some(FaultScenario::DuplicateMessage) => {
                Self::check_duplicate(message, &mut details);
                Severity::Timing
            }
            Some(FaultScenario::InvalidChecksum) => {
                Self::check_checksum(message, &mut details);
                Severity::Semantic
            }
            Some(FaultScenario::MissingRequiredFields) => {
                Self::check_required_fields(message, &mut details);
                Severity::Semantic
            }
            Some(FaultScenario::InvalidDataTypes) => {
                Self::check_field_types(message, &mut details);
                Severity::Semantic
            }
            Some(FaultScenario::EnumOutOfRange) => {
                Self::check_enum_values(message, &mut details);
                Severity::Semantic
            }
            None => {
                Self::default_sweep(message, context, &mut details);
                Severity::Semantic
            }
        };

        ValidationResult::from_details(severity, "Exception scenario validation failed", details)
    }

    fn name(&self) -> &'static str {
        "ExceptionScenarioValidator"
    }

    fn priority(&self) -> u32 {
        5
    }
}
