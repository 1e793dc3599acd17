//! Scenario execution: wait engine, step executor and the run registry.

mod executor;
mod registry;
pub mod wait;

pub use executor::{ExecutorConfig, ScenarioExecutor};
pub use registry::{ExecutionRecord, RunRegistry};
pub use wait::{wait_for, wait_for_every, WaitOutcome, DEFAULT_POLL_INTERVAL};
