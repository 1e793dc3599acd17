//! Validator capability and the ordered chain.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use fxl_model::{FixMessage, Severity, ValidationResult};

use crate::compliance::{ComplianceRuleSet, ComplianceValidator};
use crate::lifecycle::{OrderLifecycleValidator, SharedTracker};
use crate::{
    BusinessLogicValidator, ExceptionScenarioValidator, FieldValueValidator, SyntaxValidator,
};

// ---------------------------------------------------------------------------
// ValidationContext
// ---------------------------------------------------------------------------

/// Environment one validation pass runs in: which session produced the
/// message, what (if anything) was expected, and scenario-specific metadata
/// such as the fault-injection selector.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub session_id: String,
    pub expected: Option<FixMessage>,
    pub metadata: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl ValidationContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            expected: None,
            metadata: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_expected(mut self, expected: FixMessage) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// A pluggable validation stage. Lower `priority` runs earlier; equal
/// priorities keep registration order.
pub trait Validator: Send + Sync {
    fn validate(&self, message: &FixMessage, context: &ValidationContext) -> ValidationResult;
    fn name(&self) -> &'static str;
    fn priority(&self) -> u32;
}

// ---------------------------------------------------------------------------
// ValidationChain
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ValidationChain {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationChain {
    /// Empty chain; register validators explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full six-stage pipeline: syntax, field-value, business logic,
    /// order lifecycle (over the given shared tracker), exception scenario,
    /// compliance (over the given rule set).
    pub fn standard(tracker: SharedTracker, rules: ComplianceRuleSet) -> Self {
        let mut chain = Self::new();
        chain.register(Box::new(SyntaxValidator));
        chain.register(Box::new(FieldValueValidator));
        chain.register(Box::new(BusinessLogicValidator));
        chain.register(Box::new(OrderLifecycleValidator::new(tracker)));
        chain.register(Box::new(ExceptionScenarioValidator::new()));
        chain.register(Box::new(ComplianceValidator::new(rules)));
        chain
    }

    /// Order-flow-focused subset: lifecycle, business logic and compliance.
    pub fn business_scenario(tracker: SharedTracker, rules: ComplianceRuleSet) -> Self {
        let mut chain = Self::new();
        chain.register(Box::new(OrderLifecycleValidator::new(tracker)));
        chain.register(Box::new(BusinessLogicValidator));
        chain.register(Box::new(ComplianceValidator::new(rules)));
        chain
    }

    /// Fault-injection-focused subset: syntax, exception scenario and
    /// field-value comparison.
    pub fn exception_scenario() -> Self {
        let mut chain = Self::new();
        chain.register(Box::new(SyntaxValidator));
        chain.register(Box::new(ExceptionScenarioValidator::new()));
        chain.register(Box::new(FieldValueValidator));
        chain
    }

    /// Insert a validator and re-sort by priority. `sort_by_key` is stable,
    /// so equal priorities keep their insertion order.
    pub fn register(&mut self, validator: Box<dyn Validator>) {
        self.validators.push(validator);
        self.validators.sort_by_key(|v| v.priority());
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run every validator in priority order, collecting results.
    ///
    /// An invalid result at the syntax layer stops the chain: a malformed
    /// message makes semantic and business checks meaningless, and their
    /// output would be noise. Invalid results at any other layer accumulate
    /// without aborting.
    pub fn validate(
        &self,
        message: &FixMessage,
        context: &ValidationContext,
    ) -> Vec<ValidationResult> {
        let mut results = Vec::with_capacity(self.validators.len());

        for validator in &self.validators {
            let result = validator.validate(message, context);
            let stop = !result.valid && result.severity == Severity::Syntax;
            results.push(result);
            if stop {
                tracing::debug!(
                    validator = validator.name(),
                    "syntax failure; skipping remaining validators"
                );
                break;
            }
        }

        results
    }

    /// `true` iff every result in the chain's output is valid.
    pub fn validate_all(&self, message: &FixMessage, context: &ValidationContext) -> bool {
        self.validate(message, context).iter().all(|r| r.valid)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
