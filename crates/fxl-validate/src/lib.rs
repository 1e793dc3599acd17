//! Layered message validation.
//!
//! A [`ValidationChain`] runs an ordered set of [`Validator`]s over each
//! exchanged message. Ordering is by validator priority (lower first); an
//! invalid result at the syntax layer short-circuits the rest of the chain.
//!
//! All wiring is explicit: the chain and the compliance rule set are
//! constructed by the caller and injected, so test runs are isolated and
//! repeatable. There are no global registries.

mod business;
mod chain;
mod compliance;
mod exception;
mod field_value;
mod lifecycle;
mod syntax;

pub use business::BusinessLogicValidator;
pub use chain::{ValidationChain, ValidationContext, Validator};
pub use compliance::{
    ComplianceConfig, ComplianceRule, ComplianceRuleSet, ComplianceValidator,
};
pub use exception::{ExceptionScenarioValidator, FaultScenario, SCENARIO_METADATA_KEY};
pub use field_value::FieldValueValidator;
pub use lifecycle::{OrderLifecycleValidator, SharedTracker};
pub use syntax::SyntaxValidator;
