//! Deterministic in-memory "paper" trading session.
//!
//! # Design
//!
//! - No randomness. Exchange order ids and exec ids are derived from a
//!   per-session counter ("EX-1", "E-1", ...).
//! - Responses are scripted by [`ResponderConfig`]: an order ack (execution
//!   report NEW/NEW) after a fixed delay, optionally followed by a fill, a
//!   cancel ack for cancel requests, a replace ack for replace requests, a
//!   heartbeat for test requests. A silent config answers nothing, which is
//!   how timeout paths are exercised.
//! - Orders are kept in a `BTreeMap` keyed by client order id so status
//!   queries and cancel/replace responses can echo real quantities.
//!
//! Delayed responses run on spawned tokio tasks; `send_message` itself never
//! blocks.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use fxl_model::{format_qty, msg_type, tags, FixMessage};

use crate::{SessionSimulator, SessionState, SimulatorError};

// ---------------------------------------------------------------------------
// ResponderConfig
// ---------------------------------------------------------------------------

/// Scripted response behavior for a paper session.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Acknowledge new orders with an execution report (NEW/NEW).
    pub ack_orders: bool,
    /// Delay before the ack is observable.
    pub ack_delay: Duration,
    /// Optional fill emitted after the ack.
    pub fill: Option<FillPlan>,
    /// Answer test requests with a heartbeat echoing the TestReqID.
    pub answer_test_requests: bool,
}

/// A scripted full fill.
#[derive(Debug, Clone)]
pub struct FillPlan {
    pub price: f64,
    pub delay: Duration,
}

impl ResponderConfig {
    /// Ack everything promptly; no fills.
    pub fn ack_only() -> Self {
        Self {
            ack_orders: true,
            ack_delay: Duration::from_millis(0),
            fill: None,
            answer_test_requests: true,
        }
    }

    /// Ack after `delay`.
    pub fn ack_after(delay: Duration) -> Self {
        Self {
            ack_delay: delay,
            ..Self::ack_only()
        }
    }

    /// Never respond to anything. Timeout-path scenarios use this.
    pub fn silent() -> Self {
        Self {
            ack_orders: false,
            ack_delay: Duration::from_millis(0),
            fill: None,
            answer_test_requests: false,
        }
    }

    pub fn with_fill(mut self, price: f64, delay: Duration) -> Self {
        self.fill = Some(FillPlan { price, delay });
        self
    }
}

// ---------------------------------------------------------------------------
// PaperSession
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TrackedOrder {
    symbol: String,
    side: String,
    qty: f64,
}

struct Inner {
    session_id: String,
    responder: ResponderConfig,
    state: Mutex<SessionState>,
    last_received: Mutex<Option<FixMessage>>,
    orders: Mutex<BTreeMap<String, TrackedOrder>>,
    exec_seq: AtomicU64,
    outbound_seq: AtomicU64,
}

/// Cheaply cloneable handle; clones share the same session.
#[derive(Clone)]
pub struct PaperSession {
    inner: Arc<Inner>,
}

impl PaperSession {
    pub fn new(session_id: impl Into<String>, responder: ResponderConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                session_id: session_id.into(),
                responder,
                state: Mutex::new(SessionState::Created),
                last_received: Mutex::new(None),
                orders: Mutex::new(BTreeMap::new()),
                exec_seq: AtomicU64::new(0),
                outbound_seq: AtomicU64::new(0),
            }),
        }
    }

    fn next_exec_seq(&self) -> u64 {
        self.inner.exec_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn next_outbound_seq(&self) -> u64 {
        self.inner.outbound_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn deliver(&self, mut response: FixMessage, delay: Duration) {
        let seq = self.next_outbound_seq();
        response.stamp_session("SIM", "HARNESS", seq, Utc::now());

        let inner = Arc::clone(&self.inner);
        if delay.is_zero() {
            *inner.last_received.lock().unwrap_or_else(|e| e.into_inner()) = Some(response);
            return;
        }

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A stopped session delivers nothing.
            if *inner.state.lock().unwrap_or_else(|e| e.into_inner()) != SessionState::LoggedOn {
                return;
            }
            *inner.last_received.lock().unwrap_or_else(|e| e.into_inner()) = Some(response);
        });
    }

    /// Execution report skeleton for the given order.
    fn execution_report(
        &self,
        cl_ord_id: &str,
        exec_type: char,
        ord_status: char,
        order: &TrackedOrder,
    ) -> FixMessage {
        let n = self.next_exec_seq();
        FixMessage::of_type(msg_type::EXECUTION_REPORT)
            .with(tags::ORDER_ID, format!("EX-{n}"))
            .with(tags::EXEC_ID, format!("E-{n}"))
            .with(tags::EXEC_TYPE, exec_type.to_string())
            .with(tags::ORD_STATUS, ord_status.to_string())
            .with(tags::CL_ORD_ID, cl_ord_id)
            .with(tags::SYMBOL, order.symbol.clone())
            .with(tags::SIDE, order.side.clone())
            .with(tags::ORDER_QTY, format_qty(order.qty))
    }

    fn respond_to_new_order(&self, message: &FixMessage) {
        let Some(cl_ord_id) = message.get(tags::CL_ORD_ID).map(str::to_string) else {
            return;
        };

        let order = TrackedOrder {
            symbol: message.get(tags::SYMBOL).unwrap_or("").to_string(),
            side: message.get(tags::SIDE).unwrap_or("1").to_string(),
            qty: message
                .get_f64(tags::ORDER_QTY)
                .and_then(Result::ok)
                .unwrap_or(0.0),
        };

        let responder = self.inner.responder.clone();
        if responder.ack_orders {
            let ack = self
                .execution_report(&cl_ord_id, '0', '0', &order)
                .with(tags::CUM_QTY, "0")
                .with(tags::LAST_SHARES, "0")
                .with(tags::LEAVES_QTY, format_qty(order.qty));
            self.deliver(ack, responder.ack_delay);

            if let Some(fill) = &responder.fill {
                let report = self
                    .execution_report(&cl_ord_id, '2', '2', &order)
                    .with(tags::LAST_SHARES, format_qty(order.qty))
                    .with(tags::LAST_PX, format_qty(fill.price))
                    .with(tags::CUM_QTY, format_qty(order.qty))
                    .with(tags::LEAVES_QTY, "0");
                self.deliver(report, responder.ack_delay + fill.delay);
            }
        }

        self.inner
            .orders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(cl_ord_id, order);
    }

    fn respond_to_cancel(&self, message: &FixMessage) {
        if !self.inner.responder.ack_orders {
            return;
        }
        let (Some(cl_ord_id), Some(orig)) = (
            message.get(tags::CL_ORD_ID).map(str::to_string),
            message.get(tags::ORIG_CL_ORD_ID).map(str::to_string),
        ) else {
            return;
        };

        let orders = self.inner.orders.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(order) = orders.get(&orig) {
            let ack = self.execution_report(&cl_ord_id, '4', '4', order);
            drop(orders);
            self.deliver(ack, self.inner.responder.ack_delay);
        }
    }

    fn respond_to_replace(&self, message: &FixMessage) {
        if !self.inner.responder.ack_orders {
            return;
        }
        let (Some(cl_ord_id), Some(orig)) = (
            message.get(tags::CL_ORD_ID).map(str::to_string),
            message.get(tags::ORIG_CL_ORD_ID).map(str::to_string),
        ) else {
            return;
        };

        let new_qty = message.get_f64(tags::ORDER_QTY).and_then(Result::ok);
        let mut orders = self.inner.orders.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(order) = orders.get_mut(&orig) {
            if let Some(q) = new_qty {
                order.qty = q;
            }
            let ack = self.execution_report(&cl_ord_id, '5', '5', order);
            drop(orders);
            self.deliver(ack, self.inner.responder.ack_delay);
        }
    }

    fn respond_to_status_request(&self, message: &FixMessage) {
        if !self.inner.responder.ack_orders {
            return;
        }
        // The paper session keys orders by client order id; a status request
        // carries the exchange OrderID, which we echo back as-is.
        let Some(order_id) = message.get(tags::ORDER_ID).map(str::to_string) else {
            return;
        };
        let order = TrackedOrder {
            symbol: message.get(tags::SYMBOL).unwrap_or("").to_string(),
            side: message.get(tags::SIDE).unwrap_or("1").to_string(),
            qty: 0.0,
        };
        let report = self.execution_report(&order_id, '0', '0', &order);
        self.deliver(report, self.inner.responder.ack_delay);
    }

    fn respond_to_test_request(&self, message: &FixMessage) {
        if !self.inner.responder.answer_test_requests {
            return;
        }
        let heartbeat = FixMessage::heartbeat(message.get(tags::TEST_REQ_ID));
        self.deliver(heartbeat, self.inner.responder.ack_delay);
    }
}

impl SessionSimulator for PaperSession {
    fn start(&self) -> Result<(), SimulatorError> {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner()) = SessionState::LoggedOn;
        debug!(session_id = %self.inner.session_id, "paper session started");
        Ok(())
    }

    fn stop(&self) {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner()) = SessionState::Disconnected;
        debug!(session_id = %self.inner.session_id, "paper session stopped");
    }

    fn send_message(&self, message: FixMessage) -> Result<(), SimulatorError> {
        if *self.inner.state.lock().unwrap_or_else(|e| e.into_inner()) != SessionState::LoggedOn {
            return Err(SimulatorError::NoActiveSession);
        }

        match message.msg_type() {
            Some(msg_type::NEW_ORDER_SINGLE) => self.respond_to_new_order(&message),
            Some(msg_type::ORDER_CANCEL_REQUEST) => self.respond_to_cancel(&message),
            Some(msg_type::ORDER_CANCEL_REPLACE_REQUEST) => self.respond_to_replace(&message),
            Some(msg_type::ORDER_STATUS_REQUEST) => self.respond_to_status_request(&message),
            Some(msg_type::TEST_REQUEST) => self.respond_to_test_request(&message),
            _ => {}
        }

        Ok(())
    }

    fn last_received_message(&self) -> Option<FixMessage> {
        self.inner
            .last_received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn session_id(&self) -> String {
        self.inner.session_id.clone()
    }

    fn session_state(&self) -> SessionState {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
