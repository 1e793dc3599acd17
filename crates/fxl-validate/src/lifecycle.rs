//! Order-lifecycle validation stage.
//!
//! Thin adapter from the chain onto the run's [`OrderLifecycleTracker`]: it
//! extracts the lifecycle-relevant fields from each order-flow message and
//! applies the matching tracker operation. Tracker rejections become invalid
//! business-level results; the tracker itself stays usable.

use std::sync::{Arc, Mutex};

use fxl_lifecycle::{CreateOrder, ExecutionEvent, OrderLifecycleTracker};
use fxl_model::{msg_type, tags, FixMessage, OrdStatus, Severity, Side, ValidationResult};

use crate::chain::{ValidationContext, Validator};

/// Tracker handle shared between the validator and the owning run. Mutations
/// are serialized behind the mutex because step waits and asynchronous
/// execution-report arrivals can interleave within one run; contention is
/// intra-run only.
pub type SharedTracker = Arc<Mutex<OrderLifecycleTracker>>;

/// Priority 4. See the `fxl-lifecycle` crate for the state machine itself.
pub struct OrderLifecycleValidator {
    tracker: SharedTracker,
}

impl OrderLifecycleValidator {
    pub fn new(tracker: SharedTracker) -> Self {
        Self { tracker }
    }

    fn required_string(
        message: &FixMessage,
        tag: u32,
        name: &str,
        details: &mut Vec<String>,
    ) -> Option<String> {
        match message.get(tag) {
            Some(v) => Some(v.to_string()),
            None => {
                details.push(format!("Required field missing: {name}({tag})"));
                None
            }
        }
    }

    fn validate_new_order(&self, message: &FixMessage) -> ValidationResult {
        let mut details = Vec::new();

        let cl_ord_id =
            Self::required_string(message, tags::CL_ORD_ID, "ClOrdID", &mut details);
        let quantity = match message.get_f64(tags::ORDER_QTY) {
            Some(Ok(q)) => Some(q),
            Some(Err(raw)) => {
                details.push(format!("OrderQty is not numeric: {raw}"));
                None
            }
            None => {
                details.push(format!("Required field missing: OrderQty({})", tags::ORDER_QTY));
                None
            }
        };

        let (Some(cl_ord_id), Some(quantity)) = (cl_ord_id, quantity) else {
            return ValidationResult::fail(
                Severity::Business,
                "New order validation failed",
                details,
            );
        };

        let price = message.get_f64(tags::PRICE).and_then(Result::ok);
        let side = message
            .get_char(tags::SIDE)
            .and_then(Result::ok)
            .and_then(Side::from_char);

        let mut tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
        match tracker.create(CreateOrder {
            client_order_id: cl_ord_id,
            quantity,
            price,
            side,
        }) {
            Ok(()) => ValidationResult::pass(Severity::Business),
            Err(rej) => ValidationResult::fail(Severity::Business, rej.message, rej.details),
        }
    }

    fn validate_cancel_request(&self, message: &FixMessage) -> ValidationResult {
        let mut details = Vec::new();
        let cl_ord_id = Self::required_string(message, tags::CL_ORD_ID, "ClOrdID", &mut details);
        let orig =
            Self::required_string(message, tags::ORIG_CL_ORD_ID, "OrigClOrdID", &mut details);

        let (Some(cl_ord_id), Some(orig)) = (cl_ord_id, orig) else {
            return ValidationResult::fail(
                Severity::Business,
                "Cancel request validation failed",
                details,
            );
        };

        let mut tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
        match tracker.cancel_request(&cl_ord_id, &orig) {
            Ok(()) => ValidationResult::pass(Severity::Business),
            Err(rej) => ValidationResult::fail(Severity::Business, rej.message, rej.details),
        }
    }

    fn validate_modify_request(&self, message: &FixMessage) -> ValidationResult {
        let mut details = Vec::new();
        let cl_ord_id = Self::required_string(message, tags::CL_ORD_ID, "ClOrdID", &mut details);
        let orig =
            Self::required_string(message, tags::ORIG_CL_ORD_ID, "OrigClOrdID", &mut details);
        let quantity = match message.get_f64(tags::ORDER_QTY) {
            Some(Ok(q)) => Some(q),
            Some(Err(raw)) => {
                details.push(format!("OrderQty is not numeric: {raw}"));
                None
            }
            None => {
                details.push(format!("Required field missing: OrderQty({})", tags::ORDER_QTY));
                None
            }
        };

        let (Some(cl_ord_id), Some(orig), Some(quantity)) = (cl_ord_id, orig, quantity) else {
            return ValidationResult::fail(
                Severity::Business,
                "Modify request validation failed",
                details,
            );
        };

        let mut tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
        match tracker.modify_request(&cl_ord_id, &orig, quantity) {
            Ok(()) => ValidationResult::pass(Severity::Business),
            Err(rej) => ValidationResult::fail(Severity::Business, rej.message, rej.details),
        }
    }

    fn validate_execution_report(&self, message: &FixMessage) -> ValidationResult {
        let mut details = Vec::new();
        let cl_ord_id = Self::required_string(message, tags::CL_ORD_ID, "ClOrdID", &mut details);
        let status = match message.get_char(tags::ORD_STATUS) {
            Some(Ok(c)) => match OrdStatus::from_char(c) {
                Some(s) => Some(s),
                None => {
                    details.push(format!("Unknown OrdStatus value: {c}"));
                    None
                }
            },
            Some(Err(raw)) => {
                details.push(format!("Invalid OrdStatus value: {raw}"));
                None
            }
            None => {
                details.push(format!(
                    "Required field missing: OrdStatus({})",
                    tags::ORD_STATUS
                ));
                None
            }
        };

        let (Some(cl_ord_id), Some(status)) = (cl_ord_id, status) else {
            return ValidationResult::fail(
                Severity::Business,
                "Execution report validation failed",
                details,
            );
        };

        let event = ExecutionEvent {
            client_order_id: cl_ord_id,
            order_id: message.get(tags::ORDER_ID).map(str::to_string),
            status,
            cumulative_qty: message.get_f64(tags::CUM_QTY).and_then(Result::ok),
            last_shares: message.get_f64(tags::LAST_SHARES).and_then(Result::ok),
            last_price: message.get_f64(tags::LAST_PX).and_then(Result::ok),
        };

        let mut tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
        match tracker.execution_event(event) {
            Ok(()) => ValidationResult::pass(Severity::Business),
            Err(rej) => ValidationResult::fail(Severity::Business, rej.message, rej.details),
        }
    }
}

impl Validator for OrderLifecycleValidator {
    fn validate(&self, message: &FixMessage, _context: &ValidationContext) -> ValidationResult {
        match message.msg_type() {
            Some(msg_type::NEW_ORDER_SINGLE) => self.validate_new_order(message),
            Some(msg_type::ORDER_CANCEL_REQUEST) => self.validate_cancel_request(message),
            Some(msg_type::ORDER_CANCEL_REPLACE_REQUEST) => self.validate_modify_request(message),
            Some(msg_type::EXECUTION_REPORT) => self.validate_execution_report(message),
            // Session-level messages carry no order lifecycle.
            _ => ValidationResult::pass(Severity::Business),
        }
    }

    fn name(&self) -> &'static str {
        "OrderLifecycleValidator"
    }

    fn priority(&self) -> u32 {
        4
    }
}
