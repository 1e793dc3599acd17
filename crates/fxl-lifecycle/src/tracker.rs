//! Order Lifecycle Tracker
//!
//! # Design
//!
//! Explicit state machine over every order observed in one scenario run.
//! Four operations drive it (create, cancel-request, modify-request and
//! execution-event), and each enforces two invariants:
//!
//! 1. **Legal transitions only.** Status may only move along the transition
//!    table in [`allowed_targets`].
//! 2. **Quantity arithmetic.** Cumulative filled quantity is monotonic,
//!    never exceeds the original quantity, and each execution report's
//!    cumulative value must equal the previous cumulative plus the newly
//!    reported fill (within [`CUM_QTY_TOLERANCE`]).
//!
//! Every rejection is a **soft** outcome ([`LifecycleRejection`] with detail
//! strings); the tracker stays usable after a failed operation. One tracker
//! instance belongs to exactly one run and is never shared across runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use fxl_model::{OrdStatus, Side};

/// Numeric slack when reconciling reported cumulative quantity against the
/// tracked running total.
pub const CUM_QTY_TOLERANCE: f64 = 0.001;

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Allowed target statuses for each source status. States not listed here
/// (the terminal ones) accept no outgoing transition.
pub fn allowed_targets(from: OrdStatus) -> &'static [OrdStatus] {
    use OrdStatus::*;
    match from {
        New => &[
            New,
            PartiallyFilled,
            Filled,
            Canceled,
            PendingCancel,
            PendingReplace,
        ],
        PartiallyFilled => &[
            PartiallyFilled,
            Filled,
            Canceled,
            PendingCancel,
            PendingReplace,
        ],
        PendingCancel => &[Canceled, PartiallyFilled],
        PendingReplace => &[Replaced, PartiallyFilled],
        Filled | Canceled | Rejected | Replaced => &[],
    }
}

fn is_cancellable(status: OrdStatus) -> bool {
    matches!(
        status,
        OrdStatus::New | OrdStatus::PartiallyFilled | OrdStatus::PendingCancel
    )
}

fn is_modifiable(status: OrdStatus) -> bool {
    matches!(
        status,
        OrdStatus::New | OrdStatus::PartiallyFilled | OrdStatus::PendingReplace
    )
}

// ---------------------------------------------------------------------------
// LifecycleRejection
// ---------------------------------------------------------------------------

/// A rejected lifecycle operation. Soft by contract: callers fold the details
/// into a validation result; nothing escalates past the owning step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleRejection {
    pub message: String,
    pub details: Vec<String>,
}

impl LifecycleRejection {
    fn new(message: &str, detail: String) -> Self {
        Self {
            message: message.to_string(),
            details: vec![detail],
        }
    }

    fn with_details(message: &str, details: Vec<String>) -> Self {
        Self {
            message: message.to_string(),
            details,
        }
    }
}

impl std::fmt::Display for LifecycleRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.message, self.details.join("; "))
    }
}

impl std::error::Error for LifecycleRejection {}

// ---------------------------------------------------------------------------
// OrderRecord
// ---------------------------------------------------------------------------

/// Tracked state of one order (or one cancel/replace request linked to an
/// order) within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Caller-assigned identifier; the tracker's map key.
    pub client_order_id: String,
    /// Exchange-assigned identifier, learned from execution reports.
    pub order_id: Option<String>,
    /// For cancel/replace entries: the client order id they target.
    pub original_order_id: Option<String>,
    pub original_qty: f64,
    pub modified_qty: Option<f64>,
    /// Running filled total; monotonic, starts at 0.
    pub cumulative_qty: f64,
    pub price: Option<f64>,
    pub side: Option<Side>,
    pub status: OrdStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inputs for a create (new-order) event.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub client_order_id: String,
    pub quantity: f64,
    pub price: Option<f64>,
    pub side: Option<Side>,
}

/// Inputs for an execution (status update) event.
#[derive(Debug, Clone)]
pub struct ExecutionEvent {
    pub client_order_id: String,
    pub order_id: Option<String>,
    pub status: OrdStatus,
    pub cumulative_qty: Option<f64>,
    pub last_shares: Option<f64>,
    pub last_price: Option<f64>,
}

// ---------------------------------------------------------------------------
// OrderLifecycleTracker
// ---------------------------------------------------------------------------

/// All orders observed in one scenario run, keyed by client order id.
///
/// Linked-order resolution (an execution report naming a cancel/replace's
/// original order) falls back to a linear scan over tracked entries; fine at
/// harness scale, swap in a link-id index if runs ever carry thousands of
/// orders.
#[derive(Debug, Default)]
pub struct OrderLifecycleTracker {
    orders: BTreeMap<String, OrderRecord>,
}

impl OrderLifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn order(&self, client_order_id: &str) -> Option<&OrderRecord> {
        self.orders.get(client_order_id)
    }

    /// New-order event. Rejects a client order id that is already tracked.
    pub fn create(&mut self, req: CreateOrder) -> Result<(), LifecycleRejection> {
        if self.orders.contains_key(&req.client_order_id) {
            return Err(LifecycleRejection::new(
                "new order rejected",
                format!("duplicate order id: {}", req.client_order_id),
            ));
        }

        let now = Utc::now();
        debug!(cl_ord_id = %req.client_order_id, qty = req.quantity, "tracking new order");
        self.orders.insert(
            req.client_order_id.clone(),
            OrderRecord {
                client_order_id: req.client_order_id,
                order_id: None,
                original_order_id: None,
                original_qty: req.quantity,
                modified_qty: None,
                cumulative_qty: 0.0,
                price: req.price,
                side: req.side,
                status: OrdStatus::New,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    /// Cancel event. Creates a linked PENDING_CANCEL entry referencing the
    /// original order.
    pub fn cancel_request(
        &mut self,
        client_order_id: &str,
        orig_client_order_id: &str,
    ) -> Result<(), LifecycleRejection> {
        let original = match self.orders.get(orig_client_order_id) {
            Some(o) => o,
            None => {
                return Err(LifecycleRejection::new(
                    "cancel request rejected",
                    format!("original order not found: {orig_client_order_id}"),
                ));
            }
        };

        if !is_cancellable(original.status) {
            return Err(LifecycleRejection::new(
                "cancel request rejected",
                format!("order cannot be cancelled in status: {}", original.status),
            ));
        }

        let now = Utc::now();
        debug!(cl_ord_id = %client_order_id, orig = %orig_client_order_id, "tracking cancel request");
        self.orders.insert(
            client_order_id.to_string(),
            OrderRecord {
                client_order_id: client_order_id.to_string(),
                order_id: None,
                original_order_id: Some(orig_client_order_id.to_string()),
                original_qty: original.original_qty,
                modified_qty: None,
                cumulative_qty: original.cumulative_qty,
                price: original.price,
                side: original.side,
                status: OrdStatus::PendingCancel,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    /// Replace event. Quantity may only shrink or stay equal; a linked
    /// PENDING_REPLACE entry is created on success.
    pub fn modify_request(
        &mut self,
        client_order_id: &str,
        orig_client_order_id: &str,
        new_quantity: f64,
    ) -> Result<(), LifecycleRejection> {
        let original = match self.orders.get(orig_client_order_id) {
            Some(o) => o,
            None => {
                return Err(LifecycleRejection::new(
                    "modify request rejected",
                    format!("original order not found: {orig_client_order_id}"),
                ));
            }
        };

        if !is_modifiable(original.status) {
            return Err(LifecycleRejection::new(
                "modify request rejected",
                format!("order cannot be modified in status: {}", original.status),
            ));
        }

        if new_quantity <= 0.0 {
            return Err(LifecycleRejection::new(
                "modify request rejected",
                format!("new quantity must be positive: {new_quantity}"),
            ));
        }

        if new_quantity > original.original_qty {
            return Err(LifecycleRejection::new(
                "modify request rejected",
                format!(
                    "cannot increase order quantity: {new_quantity} > {}",
                    original.original_qty
                ),
            ));
        }

        let now = Utc::now();
        debug!(cl_ord_id = %client_order_id, orig = %orig_client_order_id, new_qty = new_quantity, "tracking modify request");
        let original_qty = original.original_qty;
        let cumulative_qty = original.cumulative_qty;
        let price = original.price;
        let side = original.side;
        self.orders.insert(
            client_order_id.to_string(),
            OrderRecord {
                client_order_id: client_order_id.to_string(),
                order_id: None,
                original_order_id: Some(orig_client_order_id.to_string()),
                original_qty,
                modified_qty: Some(new_quantity),
                cumulative_qty,
                price,
                side,
                status: OrdStatus::PendingReplace,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    /// Execution (status update) event.
    ///
    /// Resolution order: direct client-order-id lookup, then a scan for a
    /// tracked entry whose link references the event's id. The transition,
    /// quantity arithmetic and trade price are all checked before anything
    /// is mutated; a rejected event leaves the record untouched.
    pub fn execution_event(&mut self, ev: ExecutionEvent) -> Result<(), LifecycleRejection> {
        let key = match self.resolve_key(&ev.client_order_id) {
            Some(k) => k,
            None => {
                return Err(LifecycleRejection::new(
                    "execution report rejected",
                    format!("order not found for execution report: {}", ev.client_order_id),
                ));
            }
        };

        let record = self.orders.get(&key).expect("resolved key exists");

        if !allowed_targets(record.status).contains(&ev.status) {
            return Err(LifecycleRejection::new(
                "execution report rejected",
                format!("invalid status transition: {} -> {}", record.status, ev.status),
            ));
        }

        let mut details = Vec::new();
        let mut new_cum = record.cumulative_qty;

        if let Some(last_shares) = ev.last_shares {
            if last_shares < 0.0 {
                details.push(format!("last shares must be non-negative: {last_shares}"));
            }

            if let Some(cum) = ev.cumulative_qty {
                if cum > record.original_qty + CUM_QTY_TOLERANCE {
                    details.push(format!(
                        "cumulative quantity exceeds original quantity: {cum} > {}",
                        record.original_qty
                    ));
                }
                if (cum - (record.cumulative_qty + last_shares)).abs() > CUM_QTY_TOLERANCE {
                    details.push("cumulative quantity calculation mismatch".to_string());
                }
                new_cum = cum;
            }
        } else if let Some(cum) = ev.cumulative_qty {
            if cum > record.original_qty + CUM_QTY_TOLERANCE {
                details.push(format!(
                    "cumulative quantity exceeds original quantity: {cum} > {}",
                    record.original_qty
                ));
            }
            new_cum = cum;
        }

        if let Some(px) = ev.last_price {
            if px <= 0.0 {
                details.push(format!("last price must be positive: {px}"));
            }
        }

        if !details.is_empty() {
            return Err(LifecycleRejection::with_details(
                "execution report rejected",
                details,
            ));
        }

        let record = self.orders.get_mut(&key).expect("resolved key exists");
        record.status = ev.status;
        if let Some(order_id) = ev.order_id {
            record.order_id = Some(order_id);
        }
        record.cumulative_qty = new_cum;
        record.updated_at = Utc::now();
        debug!(cl_ord_id = %key, status = %record.status, cum_qty = record.cumulative_qty, "order state updated");
        Ok(())
    }

    /// Direct lookup, then scan for an entry whose original-order link points
    /// at `client_order_id`.
    fn resolve_key(&self, client_order_id: &str) -> Option<String> {
        if self.orders.contains_key(client_order_id) {
            return Some(client_order_id.to_string());
        }
        self.orders
            .values()
            .find(|o| o.original_order_id.as_deref() == Some(client_order_id))
            .map(|o| o.client_order_id.clone())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn create(tracker: &mut OrderLifecycleTracker, id: &str, qty: f64) {
        tracker
            .create(CreateOrder {
                client_order_id: id.to_string(),
                quantity: qty,
                price: None,
                side: Some(Side::Buy),
            })
            .unwrap();
    }

    fn exec(id: &str, status: OrdStatus) -> ExecutionEvent {
        ExecutionEvent {
            client_order_id: id.to_string(),
            order_id: Some(format!("EX-{id}")),
            status,
            cumulative_qty: None,
            last_shares: None,
            last_price: None,
        }
    }

    #[test]
    fn new_order_starts_in_new() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);
        let rec = t.order("ord-1").unwrap();
        assert_eq!(rec.status, OrdStatus::New);
        assert_eq!(rec.cumulative_qty, 0.0);
    }

    #[test]
    fn duplicate_order_id_is_rejected() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);
        let err = t
            .create(CreateOrder {
                client_order_id: "ord-1".to_string(),
                quantity: 50.0,
                price: Some(10.0),
                side: Some(Side::Sell),
            })
            .unwrap_err();
        assert!(err.to_string().contains("duplicate order id"));
        // Tracker stays usable and the original record is untouched.
        assert_eq!(t.order("ord-1").unwrap().original_qty, 100.0);
    }

    #[test]
    fn cancel_of_untracked_original_fails() {
        let mut t = OrderLifecycleTracker::new();
        let err = t.cancel_request("cxl-1", "ghost").unwrap_err();
        assert!(err.to_string().contains("original order not found"));
    }

    #[test]
    fn cancel_creates_linked_pending_cancel_entry() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);
        t.cancel_request("cxl-1", "ord-1").unwrap();
        let rec = t.order("cxl-1").unwrap();
        assert_eq!(rec.status, OrdStatus::PendingCancel);
        assert_eq!(rec.original_order_id.as_deref(), Some("ord-1"));
    }

    #[test]
    fn cancel_of_filled_order_fails() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);
        t.execution_event(exec("ord-1", OrdStatus::Filled)).unwrap();
        let err = t.cancel_request("cxl-1", "ord-1").unwrap_err();
        assert!(err.to_string().contains("cannot be cancelled"));
    }

    #[test]
    fn modify_cannot_increase_quantity() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);
        let err = t.modify_request("mod-1", "ord-1", 150.0).unwrap_err();
        assert!(err.to_string().contains("cannot increase order quantity"));
        // Shrinking is fine.
        t.modify_request("mod-2", "ord-1", 50.0).unwrap();
        assert_eq!(t.order("mod-2").unwrap().status, OrdStatus::PendingReplace);
    }

    #[test]
    fn modify_rejects_non_positive_quantity() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);
        let err = t.modify_request("mod-1", "ord-1", 0.0).unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn pending_replace_accepts_partial_fill_but_not_cancel() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);
        t.modify_request("mod-1", "ord-1", 80.0).unwrap();

        // PENDING_REPLACE -> PARTIALLY_FILLED is legal.
        t.execution_event(ExecutionEvent {
            client_order_id: "mod-1".to_string(),
            order_id: None,
            status: OrdStatus::PartiallyFilled,
            cumulative_qty: Some(10.0),
            last_shares: Some(10.0),
            last_price: Some(101.5),
        })
        .unwrap();
        assert_eq!(t.order("mod-1").unwrap().status, OrdStatus::PartiallyFilled);

        // Re-enter PENDING_REPLACE, then try an illegal CANCELED transition.
        t.modify_request("mod-2", "ord-1", 70.0).unwrap();
        let err = t
            .execution_event(exec("mod-2", OrdStatus::Canceled))
            .unwrap_err();
        assert!(err.to_string().contains("invalid status transition"));
    }

    #[test]
    fn cancel_ack_completes_the_pending_cancel_entry() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);
        t.cancel_request("cxl-1", "ord-1").unwrap();
        t.execution_event(exec("cxl-1", OrdStatus::Canceled)).unwrap();
        assert_eq!(t.order("cxl-1").unwrap().status, OrdStatus::Canceled);
    }

    #[test]
    fn execution_report_for_unknown_order_fails() {
        let mut t = OrderLifecycleTracker::new();
        let err = t
            .execution_event(exec("ghost", OrdStatus::New))
            .unwrap_err();
        assert!(err.to_string().contains("order not found"));
    }

    #[test]
    fn cumulative_quantity_never_exceeds_original() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);

        t.execution_event(ExecutionEvent {
            client_order_id: "ord-1".to_string(),
            order_id: None,
            status: OrdStatus::PartiallyFilled,
            cumulative_qty: Some(60.0),
            last_shares: Some(60.0),
            last_price: Some(10.0),
        })
        .unwrap();

        // 60 + 50 = 110 > 100: both the bound and the arithmetic fail.
        let err = t
            .execution_event(ExecutionEvent {
                client_order_id: "ord-1".to_string(),
                order_id: None,
                status: OrdStatus::Filled,
                cumulative_qty: Some(110.0),
                last_shares: Some(50.0),
                last_price: Some(10.0),
            })
            .unwrap_err();
        assert!(err
            .details
            .iter()
            .any(|d| d.contains("exceeds original quantity")));

        // Rejected event must not have mutated the record.
        let rec = t.order("ord-1").unwrap();
        assert_eq!(rec.cumulative_qty, 60.0);
        assert_eq!(rec.status, OrdStatus::PartiallyFilled);
        assert!(rec.cumulative_qty <= rec.original_qty);
    }

    #[test]
    fn cumulative_arithmetic_mismatch_is_flagged() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);
        let err = t
            .execution_event(ExecutionEvent {
                client_order_id: "ord-1".to_string(),
                order_id: None,
                status: OrdStatus::PartiallyFilled,
                cumulative_qty: Some(40.0),
                last_shares: Some(30.0),
                last_price: Some(10.0),
            })
            .unwrap_err();
        assert!(err
            .details
            .iter()
            .any(|d| d.contains("calculation mismatch")));
    }

    #[test]
    fn cumulative_arithmetic_within_tolerance_passes() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);
        t.execution_event(ExecutionEvent {
            client_order_id: "ord-1".to_string(),
            order_id: None,
            status: OrdStatus::PartiallyFilled,
            cumulative_qty: Some(30.0005),
            last_shares: Some(30.0),
            last_price: Some(10.0),
        })
        .unwrap();
        assert!((t.order("ord-1").unwrap().cumulative_qty - 30.0005).abs() < 1e-9);
    }

    #[test]
    fn non_positive_trade_price_is_rejected() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);
        let err = t
            .execution_event(ExecutionEvent {
                client_order_id: "ord-1".to_string(),
                order_id: None,
                status: OrdStatus::PartiallyFilled,
                cumulative_qty: Some(10.0),
                last_shares: Some(10.0),
                last_price: Some(0.0),
            })
            .unwrap_err();
        assert!(err.to_string().contains("last price must be positive"));
    }

    #[test]
    fn tracker_survives_a_full_cancel_replace_conversation() {
        let mut t = OrderLifecycleTracker::new();
        create(&mut t, "ord-1", 100.0);

        // Partial fill on the original.
        t.execution_event(ExecutionEvent {
            client_order_id: "ord-1".to_string(),
            order_id: Some("EX-1".to_string()),
            status: OrdStatus::PartiallyFilled,
            cumulative_qty: Some(25.0),
            last_shares: Some(25.0),
            last_price: Some(99.5),
        })
        .unwrap();

        // Replace shrinks to 80; broker confirms.
        t.modify_request("mod-1", "ord-1", 80.0).unwrap();
        t.execution_event(exec("mod-1", OrdStatus::Replaced)).unwrap();
        assert_eq!(t.order("mod-1").unwrap().status, OrdStatus::Replaced);

        // The original entry is still readable.
        assert_eq!(t.order("ord-1").unwrap().cumulative_qty, 25.0);
        assert_eq!(t.len(), 2);
    }
}
