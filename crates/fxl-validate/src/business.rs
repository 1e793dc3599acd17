//! Type-specific domain rules.

use fxl_model::{msg_type, tags, ExecType, FixMessage, OrdStatus, OrdType, Severity, Side, ValidationResult};

use crate::chain::{ValidationContext, Validator};

/// Priority 3. Domain rules per message type: positive quantities, prices
/// where the order type demands one, enumerated sides, and for execution
/// reports the exec-type/order-status compatibility table.
pub struct BusinessLogicValidator;

impl BusinessLogicValidator {
    fn check_new_order(message: &FixMessage, details: &mut Vec<String>) {
        match message.get_f64(tags::ORDER_QTY) {
            Some(Ok(qty)) if qty <= 0.0 => {
                details.push(format!("Order quantity must be positive: {qty}"))
            }
            Some(Ok(_)) => {}
            Some(Err(raw)) => details.push(format!("Order quantity is not numeric: {raw}")),
            None => details.push("Order quantity is required".to_string()),
        }

        if let Some(Ok(c)) = message.get_char(tags::ORD_TYPE) {
            match OrdType::from_char(c) {
                Some(t) if t.requires_price() => match message.get_f64(tags::PRICE) {
                    Some(Ok(price)) if price <= 0.0 => details.push(format!(
                        "Price must be positive for limit/stop orders: {price}"
                    )),
                    Some(Ok(_)) => {}
                    Some(Err(raw)) => details.push(format!("Price is not numeric: {raw}")),
                    None => details.push("Price is required for limit/stop orders".to_string()),
                },
                _ => {}
            }
        }

        match message.get_char(tags::SIDE) {
            Some(Ok(c)) if Side::from_char(c).is_none() => {
                details.push(format!("Invalid side value: {c}"))
            }
            Some(Err(raw)) => details.push(format!("Invalid side value: {raw}")),
            _ => {}
        }
    }

    fn check_execution_report(message: &FixMessage, details: &mut Vec<String>) {
        if let (Some(Ok(exec_c)), Some(Ok(status_c))) = (
            message.get_char(tags::EXEC_TYPE),
            message.get_char(tags::ORD_STATUS),
        ) {
            if !compatible_exec_status(exec_c, status_c) {
                details.push(format!(
                    "Invalid ExecType/OrdStatus combination: {exec_c}/{status_c}"
                ));
            }
        }

        if let (Some(Ok(last_shares)), Some(Ok(order_qty))) = (
            message.get_f64(tags::LAST_SHARES),
            message.get_f64(tags::ORDER_QTY),
        ) {
            if last_shares > order_qty {
                details.push(format!(
                    "Last shares ({last_shares}) exceeds order quantity ({order_qty})"
                ));
            }
        }

        if let Some(Ok(last_px)) = message.get_f64(tags::LAST_PX) {
            if last_px <= 0.0 {
                details.push(format!("Last price must be positive: {last_px}"));
            }
        }
    }

    fn check_cancel_request(message: &FixMessage, details: &mut Vec<String>) {
        if let Some(Ok(qty)) = message.get_f64(tags::ORDER_QTY) {
            if qty <= 0.0 {
                details.push(format!("Cancel quantity must be positive: {qty}"));
            }
        }

        if !message.contains(tags::ORIG_CL_ORD_ID) {
            details.push(format!(
                "Missing OrigClOrdID({}) in OrderCancelRequest",
                tags::ORIG_CL_ORD_ID
            ));
        }
    }
}

/// Compatible exec-type/order-status pairs. Exec types outside the table are
/// allowed by design: flagging every vendor extension would make unknown
/// codes false positives, and the enum-range check surfaces them separately.
fn compatible_exec_status(exec_type: char, ord_status: char) -> bool {
    let expected = match ExecType::from_char(exec_type) {
        Some(ExecType::New) => OrdStatus::New,
        Some(ExecType::PartialFill) => OrdStatus::PartiallyFilled,
        Some(ExecType::Fill) => OrdStatus::Filled,
        Some(ExecType::Canceled) => OrdStatus::Canceled,
        Some(ExecType::Replaced) => OrdStatus::Replaced,
        Some(ExecType::Rejected) => OrdStatus::Rejected,
        _ => return true,
    };
    OrdStatus::from_char(ord_status) == Some(expected)
}

impl Validator for BusinessLogicValidator {
    fn validate(&self, message: &FixMessage, _context: &ValidationContext) -> ValidationResult {
        let mut details = Vec::new();

        match message.msg_type() {
            Some(msg_type::NEW_ORDER_SINGLE) => Self::check_new_order(message, &mut details),
            Some(msg_type::EXECUTION_REPORT) => Self::check_execution_report(message, &mut details),
            Some(msg_type::ORDER_CANCEL_REQUEST) => Self::check_cancel_request(message, &mut details),
            // Session-level and other supported types carry no business rules.
            _ => {}
        }

        ValidationResult::from_details(Severity::Business, "Business logic validation failed", details)
    }

    fn name(&self) -> &'static str {
        "BusinessLogicValidator"
    }

    fn priority(&self) -> u32 {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ctx() -> ValidationContext {
        ValidationContext::new("s1")
    }

    #[test]
    fn market_order_needs_no_price() {
        let m = FixMessage::new_order_single("o1", "AAPL", Side::Buy, OrdType::Market, 100.0, Utc::now());
        assert!(BusinessLogicValidator.validate(&m, &ctx()).valid);
    }

    #[test]
    fn limit_order_without_price_fails() {
        let m = FixMessage::new_order_single("o1", "AAPL", Side::Buy, OrdType::Limit, 100.0, Utc::now());
        let r = BusinessLogicValidator.validate(&m, &ctx());
        assert!(!r.valid);
        assert!(r.details.iter().any(|d| d.contains("Price is required")));
    }

    #[test]
    fn stop_order_with_non_positive_price_fails() {
        let m = FixMessage::new_order_single("o1", "AAPL", Side::Buy, OrdType::Stop, 100.0, Utc::now())
            .with_price(0.0);
        let r = BusinessLogicValidator.validate(&m, &ctx());
        assert!(!r.valid);
        assert!(r.details.iter().any(|d| d.contains("must be positive for limit/stop")));
    }

    #[test]
    fn zero_quantity_fails() {
        let m = FixMessage::new_order_single("o1", "AAPL", Side::Buy, OrdType::Market, 0.0, Utc::now());
        let r = BusinessLogicValidator.validate(&m, &ctx());
        assert!(!r.valid);
        assert!(r.details.iter().any(|d| d.contains("quantity must be positive")));
    }

    #[test]
    fn invalid_side_fails() {
        let mut m = FixMessage::new_order_single("o1", "AAPL", Side::Buy, OrdType::Market, 100.0, Utc::now());
        m.set(tags::SIDE, "9");
        let r = BusinessLogicValidator.validate(&m, &ctx());
        assert!(!r.valid);
        assert!(r.details.iter().any(|d| d.contains("Invalid side value: 9")));
    }

    #[test]
    fn matching_exec_type_and_status_pass() {
        let m = FixMessage::of_type("8").with(tags::EXEC_TYPE, "2").with(tags::ORD_STATUS, "2");
        assert!(BusinessLogicValidator.validate(&m, &ctx()).valid);
    }

    #[test]
    fn mismatched_exec_type_and_status_fail() {
        let m = FixMessage::of_type("8").with(tags::EXEC_TYPE, "2").with(tags::ORD_STATUS, "4");
        let r = BusinessLogicValidator.validate(&m, &ctx());
        assert!(!r.valid);
        assert!(r.details.iter().any(|d| d.contains("Invalid ExecType/OrdStatus combination: 2/4")));
    }

    #[test]
    fn unknown_exec_type_defaults_to_allowed() {
        let m = FixMessage::of_type("8").with(tags::EXEC_TYPE, "Z").with(tags::ORD_STATUS, "4");
        assert!(BusinessLogicValidator.validate(&m, &ctx()).valid);
    }

    #[test]
    fn last_shares_above_order_qty_fails() {
        let m = FixMessage::of_type("8")
            .with(tags::EXEC_TYPE, "1")
            .with(tags::ORD_STATUS, "1")
            .with(tags::LAST_SHARES, "150")
            .with(tags::ORDER_QTY, "100");
        let r = BusinessLogicValidator.validate(&m, &ctx());
        assert!(!r.valid);
        assert!(r.details.iter().any(|d| d.contains("exceeds order quantity")));
    }

    #[test]
    fn cancel_request_requires_orig_cl_ord_id() {
        let m = FixMessage::of_type("F").with(tags::CL_ORD_ID, "c1");
        let r = BusinessLogicValidator.validate(&m, &ctx());
        assert!(!r.valid);
        assert!(r.details.iter().any(|d| d.contains("OrigClOrdID(41)")));
    }
}
