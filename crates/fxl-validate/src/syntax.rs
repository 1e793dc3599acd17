//! Structural (syntax-level) message checks.

use fxl_model::{msg_type, tags, FixMessage, Severity, ValidationResult};

use crate::chain::{ValidationContext, Validator};

/// Mandatory header fields for every message.
pub(crate) const REQUIRED_HEADER: &[(u32, &str)] = &[
    (tags::BEGIN_STRING, "BeginString"),
    (tags::BODY_LENGTH, "BodyLength"),
    (tags::MSG_TYPE, "MsgType"),
    (tags::SENDER_COMP_ID, "SenderCompID"),
    (tags::TARGET_COMP_ID, "TargetCompID"),
    (tags::MSG_SEQ_NUM, "MsgSeqNum"),
];

/// Mandatory body fields per message type. `None` means the type is not one
/// the harness supports: an explicit finding, never a silent pass.
pub(crate) fn required_body_fields(t: &str) -> Option<&'static [(u32, &'static str)]> {
    match t {
        msg_type::LOGON => Some(&[
            (tags::ENCRYPT_METHOD, "EncryptMethod"),
            (tags::HEART_BT_INT, "HeartBtInt"),
        ]),
        msg_type::TEST_REQUEST => Some(&[(tags::TEST_REQ_ID, "TestReqID")]),
        msg_type::NEW_ORDER_SINGLE => Some(&[
            (tags::CL_ORD_ID, "ClOrdID"),
            (tags::SIDE, "Side"),
            (tags::TRANSACT_TIME, "TransactTime"),
            (tags::ORD_TYPE, "OrdType"),
        ]),
        msg_type::EXECUTION_REPORT => Some(&[
            (tags::ORDER_ID, "OrderID"),
            (tags::EXEC_ID, "ExecID"),
            (tags::EXEC_TYPE, "ExecType"),
            (tags::ORD_STATUS, "OrdStatus"),
        ]),
        msg_type::ORDER_CANCEL_REQUEST => Some(&[
            (tags::CL_ORD_ID, "ClOrdID"),
            (tags::ORIG_CL_ORD_ID, "OrigClOrdID"),
        ]),
        msg_type::ORDER_CANCEL_REPLACE_REQUEST => Some(&[
            (tags::CL_ORD_ID, "ClOrdID"),
            (tags::ORIG_CL_ORD_ID, "OrigClOrdID"),
            (tags::ORDER_QTY, "OrderQty"),
        ]),
        msg_type::ORDER_STATUS_REQUEST => Some(&[(tags::ORDER_ID, "OrderID")]),
        t if msg_type::is_supported(t) => Some(&[]),
        _ => None,
    }
}

fn describe_msg_type(t: &str) -> &'static str {
    match t {
        msg_type::HEARTBEAT => "Heartbeat",
        msg_type::TEST_REQUEST => "TestRequest",
        msg_type::LOGON => "Logon",
        msg_type::LOGOUT => "Logout",
        msg_type::NEW_ORDER_SINGLE => "NewOrderSingle",
        msg_type::EXECUTION_REPORT => "ExecutionReport",
        msg_type::ORDER_CANCEL_REQUEST => "OrderCancelRequest",
        msg_type::ORDER_CANCEL_REPLACE_REQUEST => "OrderCancelReplaceRequest",
        msg_type::ORDER_CANCEL_REJECT => "OrderCancelReject",
        msg_type::ORDER_STATUS_REQUEST => "OrderStatusRequest",
        _ => "message",
    }
}

/// Priority 1. Checks mandatory header/trailer fields and the per-type
/// mandatory body fields. Runs first; an invalid result here stops the chain.
pub struct SyntaxValidator;

impl Validator for SyntaxValidator {
    fn validate(&self, message: &FixMessage, _context: &ValidationContext) -> ValidationResult {
        let mut details = Vec::new();

        for (tag, name) in REQUIRED_HEADER {
            if !message.header.contains_key(tag) {
                details.push(format!("Missing {name}({tag}) in header"));
            }
        }

        match message.msg_type() {
            Some(t) => match required_body_fields(t) {
                Some(required) => {
                    let label = describe_msg_type(t);
                    for (tag, name) in required {
                        if !message.body.contains_key(tag) {
                            details.push(format!("Missing {name}({tag}) in {label} message"));
                        }
                    }
                }
                None => details.push(format!("Unsupported message type: {t}")),
            },
            // Already reported as a missing header field above.
            None => {}
        }

        if !message.trailer.contains_key(&tags::CHECK_SUM) {
            details.push(format!("Missing CheckSum({}) in trailer", tags::CHECK_SUM));
        }

        ValidationResult::from_details(Severity::Syntax, "Syntax validation failed", details)
    }

    fn name(&self) -> &'static str {
        "SyntaxValidator"
    }

    fn priority(&self) -> u32 {
        1
    }
}
