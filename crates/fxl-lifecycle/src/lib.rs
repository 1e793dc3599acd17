//! Per-run order lifecycle tracking.

mod tracker;

pub use tracker::{
    CreateOrder, ExecutionEvent, LifecycleRejection, OrderLifecycleTracker, OrderRecord,
    CUM_QTY_TOLERANCE,
};
