//! Field-by-field comparison against an expected message.

use std::collections::BTreeMap;

use fxl_model::{tags, FixMessage, Severity, ValidationResult};

use crate::chain::{ValidationContext, Validator};

/// Priority 2. When the context carries an expected message, checks the
/// message type and then every expected field across header, body and
/// trailer. Reports every mismatched or missing tag, not just the first.
/// Without an expected message there is nothing to compare, so pass.
pub struct FieldValueValidator;

impl FieldValueValidator {
    fn compare_section(
        actual: &BTreeMap<u32, String>,
        expected: &BTreeMap<u32, String>,
        section: &str,
        details: &mut Vec<String>,
    ) {
        for (tag, expected_value) in expected {
            match actual.get(tag) {
                None => details.push(format!("Missing {section} field [tag={tag}]")),
                Some(actual_value) if actual_value != expected_value => {
                    details.push(format!(
                        "{section} field mismatch [tag={tag}]: expected={expected_value}, actual={actual_value}"
                    ));
                }
                Some(_) => {}
            }
        }
    }
}

impl Validator for FieldValueValidator {
    fn validate(&self, message: &FixMessage, context: &ValidationContext) -> ValidationResult {
        let expected = match &context.expected {
            Some(e) => e,
            None => return ValidationResult::pass(Severity::Semantic),
        };

        let mut details = Vec::new();

        if let Some(expected_type) = expected.msg_type() {
            match message.msg_type() {
                None => details.push("Message type field not found".to_string()),
                Some(actual_type) if actual_type != expected_type => details.push(format!(
                    "Message type mismatch: expected={expected_type}, actual={actual_type}"
                )),
                Some(_) => {}
            }
        }

        // Header comparison skips MsgType (reported above, once).
        let mut expected_header = expected.header.clone();
        expected_header.remove(&tags::MSG_TYPE);
        Self::compare_section(&message.header, &expected_header, "header", &mut details);
        Self::compare_section(&message.body, &expected.body, "body", &mut details);
        Self::compare_section(&message.trailer, &expected.trailer, "trailer", &mut details);

        ValidationResult::from_details(Severity::Semantic, "Field value validation failed", details)
    }

    fn name(&self) -> &'static str {
        "FieldValueValidator"
    }

    fn priority(&self) -> u32 {
        2
    }
}
