//! HTTP control surface for the conformance harness.

pub mod api_types;
pub mod routes;
pub mod state;
