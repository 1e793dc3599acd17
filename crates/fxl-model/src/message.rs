//! In-memory FIX message value type.
//!
//! # Design
//!
//! The harness never touches the tag=value wire format; a message is three
//! ordered tag→value sections (header, body, trailer). Field access is an
//! explicit present/absent lookup; absence is a value, not an exception.
//! `BTreeMap` keeps iteration deterministic for comparison and logging.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codes::{msg_type, OrdType, Side, TimeInForce};
use crate::tags;

/// FIX timestamp format (UTCTimestamp, whole seconds).
pub const UTC_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixMessage {
    pub header: BTreeMap<u32, String>,
    pub body: BTreeMap<u32, String>,
    pub trailer: BTreeMap<u32, String>,
}

impl FixMessage {
    /// Empty message with only the given type set (tag 35).
    pub fn of_type(msg_type: &str) -> Self {
        let mut m = Self::default();
        m.header.insert(tags::MSG_TYPE, msg_type.to_string());
        m
    }

    // -- field access --------------------------------------------------------

    /// Body-first lookup across all three sections.
    pub fn get(&self, tag: u32) -> Option<&str> {
        self.body
            .get(&tag)
            .or_else(|| self.header.get(&tag))
            .or_else(|| self.trailer.get(&tag))
            .map(String::as_str)
    }

    pub fn contains(&self, tag: u32) -> bool {
        self.get(tag).is_some()
    }

    /// Parsed numeric field. `None` when absent, `Some(Err)` when present but
    /// not a number; validators report the two cases differently.
    pub fn get_f64(&self, tag: u32) -> Option<Result<f64, String>> {
        self.get(tag)
            .map(|v| v.parse::<f64>().map_err(|_| v.to_string()))
    }

    /// Single-character field. `Some(Err)` when the value is not exactly one
    /// character.
    pub fn get_char(&self, tag: u32) -> Option<Result<char, String>> {
        self.get(tag).map(|v| {
            let mut chars = v.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(v.to_string()),
            }
        })
    }

    pub fn msg_type(&self) -> Option<&str> {
        self.header.get(&tags::MSG_TYPE).map(String::as_str)
    }

    // -- building ------------------------------------------------------------

    pub fn set(&mut self, tag: u32, value: impl Into<String>) -> &mut Self {
        self.body.insert(tag, value.into());
        self
    }

    pub fn set_header(&mut self, tag: u32, value: impl Into<String>) -> &mut Self {
        self.header.insert(tag, value.into());
        self
    }

    pub fn set_trailer(&mut self, tag: u32, value: impl Into<String>) -> &mut Self {
        self.trailer.insert(tag, value.into());
        self
    }

    /// Chainable body-field setter for builder-style construction.
    pub fn with(mut self, tag: u32, value: impl Into<String>) -> Self {
        self.body.insert(tag, value.into());
        self
    }

    // -- session stamping ----------------------------------------------------

    /// Fill in the session-level header and trailer fields a transport engine
    /// would own: BeginString, BodyLength, comp ids, sequence number, sending
    /// time and checksum. Existing values are overwritten: the stamper is
    /// the session, not the step author.
    pub fn stamp_session(
        &mut self,
        sender_comp_id: &str,
        target_comp_id: &str,
        seq_num: u64,
        sending_time: DateTime<Utc>,
    ) {
        self.header
            .insert(tags::BEGIN_STRING, "FIX.4.2".to_string());
        self.header
            .insert(tags::SENDER_COMP_ID, sender_comp_id.to_string());
        self.header
            .insert(tags::TARGET_COMP_ID, target_comp_id.to_string());
        self.header.insert(tags::MSG_SEQ_NUM, seq_num.to_string());
        self.header.insert(
            tags::SENDING_TIME,
            sending_time.format(UTC_TIMESTAMP_FORMAT).to_string(),
        );
        self.header
            .insert(tags::BODY_LENGTH, self.body_length().to_string());
        let checksum = self.compute_checksum();
        self.trailer.insert(tags::CHECK_SUM, checksum);
    }

    /// Byte length of the body section in tag=value form.
    pub fn body_length(&self) -> usize {
        self.body
            .iter()
            .map(|(tag, value)| tag.to_string().len() + 1 + value.len() + 1)
            .sum()
    }

    /// Three-digit modulo-256 checksum over header and body, in field order.
    /// Used both by the paper session when stamping and by the
    /// invalid-checksum fault scenario when verifying.
    pub fn compute_checksum(&self) -> String {
        let mut sum: u32 = 0;
        for (tag, value) in self.header.iter().chain(self.body.iter()) {
            for b in tag.to_string().bytes() {
                sum = sum.wrapping_add(u32::from(b));
            }
            sum = sum.wrapping_add(u32::from(b'='));
            for b in value.bytes() {
                sum = sum.wrapping_add(u32::from(b));
            }
            sum = sum.wrapping_add(1); // SOH delimiter
        }
        format!("{:03}", sum % 256)
    }

    // -- message constructors ------------------------------------------------

    pub fn heartbeat(test_req_id: Option<&str>) -> Self {
        let mut m = Self::of_type(msg_type::HEARTBEAT);
        if let Some(id) = test_req_id {
            m.set(tags::TEST_REQ_ID, id);
        }
        m
    }

    pub fn test_request(test_req_id: &str) -> Self {
        Self::of_type(msg_type::TEST_REQUEST).with(tags::TEST_REQ_ID, test_req_id)
    }

    pub fn new_order_single(
        cl_ord_id: &str,
        symbol: &str,
        side: Side,
        ord_type: OrdType,
        quantity: f64,
        transact_time: DateTime<Utc>,
    ) -> Self {
        Self::of_type(msg_type::NEW_ORDER_SINGLE)
            .with(tags::CL_ORD_ID, cl_ord_id)
            .with(tags::SYMBOL, symbol)
            .with(tags::SIDE, side.as_char().to_string())
            .with(tags::ORD_TYPE, ord_type.as_char().to_string())
            .with(tags::ORDER_QTY, format_qty(quantity))
            .with(
                tags::TRANSACT_TIME,
                transact_time.format(UTC_TIMESTAMP_FORMAT).to_string(),
            )
    }

    pub fn order_cancel_request(
        cl_ord_id: &str,
        orig_cl_ord_id: &str,
        symbol: &str,
        side: Side,
        quantity: f64,
        transact_time: DateTime<Utc>,
    ) -> Self {
        Self::of_type(msg_type::ORDER_CANCEL_REQUEST)
            .with(tags::CL_ORD_ID, cl_ord_id)
            .with(tags::ORIG_CL_ORD_ID, orig_cl_ord_id)
            .with(tags::SYMBOL, symbol)
            .with(tags::SIDE, side.as_char().to_string())
            .with(tags::ORDER_QTY, format_qty(quantity))
            .with(
                tags::TRANSACT_TIME,
                transact_time.format(UTC_TIMESTAMP_FORMAT).to_string(),
            )
    }

    pub fn order_cancel_replace_request(
        cl_ord_id: &str,
        orig_cl_ord_id: &str,
        symbol: &str,
        side: Side,
        new_quantity: f64,
        transact_time: DateTime<Utc>,
    ) -> Self {
        Self::of_type(msg_type::ORDER_CANCEL_REPLACE_REQUEST)
            .with(tags::CL_ORD_ID, cl_ord_id)
            .with(tags::ORIG_CL_ORD_ID, orig_cl_ord_id)
            .with(tags::SYMBOL, symbol)
            .with(tags::SIDE, side.as_char().to_string())
            .with(tags::ORDER_QTY, format_qty(new_quantity))
            .with(
                tags::TRANSACT_TIME,
                transact_time.format(UTC_TIMESTAMP_FORMAT).to_string(),
            )
    }

    pub fn order_status_request(order_id: &str, symbol: &str, side: Side) -> Self {
        Self::of_type(msg_type::ORDER_STATUS_REQUEST)
            .with(tags::ORDER_ID, order_id)
            .with(tags::SYMBOL, symbol)
            .with(tags::SIDE, side.as_char().to_string())
    }

    /// Optional time-in-force on any order message.
    pub fn with_time_in_force(self, tif: TimeInForce) -> Self {
        self.with(tags::TIME_IN_FORCE, tif.as_char().to_string())
    }

    /// Optional price on any order message.
    pub fn with_price(self, price: f64) -> Self {
        self.with(tags::PRICE, format_qty(price))
    }
}

/// Quantities and prices print without a trailing `.0` when integral, which
/// is how counterparties format them and what field-equality checks compare.
pub fn format_qty(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}
