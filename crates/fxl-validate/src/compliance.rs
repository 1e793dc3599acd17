//! Business/regulatory compliance rules.
//!
//! Each message type maps to an ordered list of applicable rules; the
//! Compliance validator's result is the union of every applicable rule's
//! failures. Limits live in a [`ComplianceConfig`] the caller constructs;
//! there is no global rule registry.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use fxl_model::{msg_type, tags, FixMessage, Severity, ValidationResult};

use crate::chain::{ValidationContext, Validator};

// ---------------------------------------------------------------------------
// ComplianceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ComplianceConfig {
    pub min_order_qty: f64,
    pub max_order_qty: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Trading window on TransactTime, hours [open, close) UTC.
    pub open_hour: u32,
    pub close_hour: u32,
    pub symbol_whitelist: BTreeSet<String>,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            min_order_qty: 100.0,
            max_order_qty: 1_000_000.0,
            min_price: 0.01,
            max_price: 10_000.0,
            open_hour: 9,
            close_hour: 17,
            symbol_whitelist: ["AAPL", "GOOGL", "MSFT", "TSLA", "AMZN"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ComplianceConfig {
    /// All-hours, wide-band variant for runs that exercise other layers.
    pub fn wide_open() -> Self {
        Self {
            open_hour: 0,
            close_hour: 24,
            min_price: f64::MIN_POSITIVE,
            max_price: f64::MAX,
            min_order_qty: 0.0,
            max_order_qty: f64::MAX,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// ComplianceRule
// ---------------------------------------------------------------------------

/// One composable rule: a name, an applicability predicate keyed by message
/// type, and the check itself.
pub trait ComplianceRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn applies_to(&self, msg_type: &str) -> bool;
    fn validate(&self, message: &FixMessage, context: &ValidationContext) -> ValidationResult;
}

/// Sender/target identifiers must be present and non-blank. Applies to every
/// message type.
struct BasicAuthenticationRule;

impl ComplianceRule for BasicAuthenticationRule {
    fn name(&self) -> &'static str {
        "BasicAuthenticationRule"
    }

    fn applies_to(&self, _msg_type: &str) -> bool {
        true
    }

    fn validate(&self, message: &FixMessage, _context: &ValidationContext) -> ValidationResult {
        let mut details = Vec::new();

        match message.header.get(&tags::SENDER_COMP_ID) {
            Some(s) if !s.trim().is_empty() => {}
            Some(s) => details.push(format!("Invalid sender: {s}")),
            None => details.push("Authentication fields missing: SenderCompID(49)".to_string()),
        }
        match message.header.get(&tags::TARGET_COMP_ID) {
            Some(s) if !s.trim().is_empty() => {}
            Some(s) => details.push(format!("Invalid target: {s}")),
            None => details.push("Authentication fields missing: TargetCompID(56)".to_string()),
        }

        ValidationResult::from_details(Severity::Business, "Authentication failed", details)
    }
}

/// Order quantity must fall inside the configured [min, max] band.
struct OrderSizeLimitRule {
    min: f64,
    max: f64,
}

impl ComplianceRule for OrderSizeLimitRule {
    fn name(&self) -> &'static str {
        "OrderSizeLimitRule"
    }

    fn applies_to(&self, t: &str) -> bool {
        matches!(
            t,
            msg_type::NEW_ORDER_SINGLE | msg_type::ORDER_CANCEL_REPLACE_REQUEST
        )
    }

    fn validate(&self, message: &FixMessage, _context: &ValidationContext) -> ValidationResult {
        let mut details = Vec::new();

        if let Some(Ok(qty)) = message.get_f64(tags::ORDER_QTY) {
            if qty < self.min {
                details.push(format!("Order size below minimum: {qty} < {}", self.min));
            }
            if qty > self.max {
                details.push(format!("Order size exceeds maximum: {qty} > {}", self.max));
            }
        }

        ValidationResult::from_details(Severity::Business, "Order size limit violated", details)
    }
}

/// Price must fall inside the configured [min, max] band when present.
struct PriceLimitRule {
    min: f64,
    max: f64,
}

impl ComplianceRule for PriceLimitRule {
    fn name(&self) -> &'static str {
        "PriceLimitRule"
    }

    fn applies_to(&self, t: &str) -> bool {
        t == msg_type::NEW_ORDER_SINGLE
    }

    fn validate(&self, message: &FixMessage, _context: &ValidationContext) -> ValidationResult {
        let mut details = Vec::new();

        if let Some(Ok(price)) = message.get_f64(tags::PRICE) {
            if price < self.min {
                details.push(format!("Price below minimum: {price} < {}", self.min));
            }
            if price > self.max {
                details.push(format!("Price exceeds maximum: {price} > {}", self.max));
            }
        }

        ValidationResult::from_details(Severity::Business, "Price limit violated", details)
    }
}

/// TransactTime must fall inside the configured trading window.
struct TradingHoursRule {
    open_hour: u32,
    close_hour: u32,
}

impl ComplianceRule for TradingHoursRule {
    fn name(&self) -> &'static str {
        "TradingHoursRule"
    }

    fn applies_to(&self, t: &str) -> bool {
        t == msg_type::NEW_ORDER_SINGLE
    }

    fn validate(&self, message: &FixMessage, _context: &ValidationContext) -> ValidationResult {
        let mut details = Vec::new();

        if let Some(raw) = message.get(tags::TRANSACT_TIME) {
            match parse_utc_timestamp(raw) {
                Some(ts) => {
                    use chrono::Timelike;
                    let hour = ts.hour();
                    if hour < self.open_hour || hour >= self.close_hour {
                        details.push(format!("Order placed outside trading hours: {hour}"));
                    }
                }
                None => details.push(format!("Unparseable TransactTime: {raw}")),
            }
        }

        ValidationResult::from_details(Severity::Business, "Trading hours violation", details)
    }
}

/// Symbol must be on the configured whitelist.
struct SymbolWhitelistRule {
    whitelist: BTreeSet<String>,
}

impl ComplianceRule for SymbolWhitelistRule {
    fn name(&self) -> &'static str {
        "SymbolWhitelistRule"
    }

    fn applies_to(&self, t: &str) -> bool {
        t == msg_type::NEW_ORDER_SINGLE
    }

    fn validate(&self, message: &FixMessage, _context: &ValidationContext) -> ValidationResult {
        let mut details = Vec::new();

        if let Some(symbol) = message.get(tags::SYMBOL) {
            if !self.whitelist.contains(symbol) {
                details.push(format!("Invalid symbol: {symbol}"));
            }
        }

        ValidationResult::from_details(Severity::Business, "Symbol validation failed", details)
    }
}

/// Cancel permission. Currently a no-op gate kept so the cancel path has a
/// compliance stage to grow into; the rule still runs and still unions.
struct CancelPermissionRule;

impl ComplianceRule for CancelPermissionRule {
    fn name(&self) -> &'static str {
        "CancelPermissionRule"
    }

    fn applies_to(&self, t: &str) -> bool {
        t == msg_type::ORDER_CANCEL_REQUEST
    }

    fn validate(&self, _message: &FixMessage, _context: &ValidationContext) -> ValidationResult {
        ValidationResult::pass(Severity::Business)
    }
}

/// Modify permission, same posture as cancel permission.
struct ModifyPermissionRule;

impl ComplianceRule for ModifyPermissionRule {
    fn name(&self) -> &'static str {
        "ModifyPermissionRule"
    }

    fn applies_to(&self, t: &str) -> bool {
        t == msg_type::ORDER_CANCEL_REPLACE_REQUEST
    }

    fn validate(&self, _message: &FixMessage, _context: &ValidationContext) -> ValidationResult {
        ValidationResult::pass(Severity::Business)
    }
}

/// FIX UTCTimestamp with or without milliseconds.
fn parse_utc_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y%m%d-%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y%m%d-%H:%M:%S%.3f"))
        .ok()
}

// ---------------------------------------------------------------------------
// ComplianceRuleSet
// ---------------------------------------------------------------------------

/// The ordered rule collection a Compliance validator evaluates.
pub struct ComplianceRuleSet {
    rules: Vec<Box<dyn ComplianceRule>>,
}

impl ComplianceRuleSet {
    pub fn new(rules: Vec<Box<dyn ComplianceRule>>) -> Self {
        Self { rules }
    }

    /// The standard rule complement: base authentication for everything,
    /// size/price/hours/symbol for new orders, permission gates for
    /// cancel/replace, size band again for replace.
    pub fn standard(cfg: ComplianceConfig) -> Self {
        Self::new(vec![
            Box::new(BasicAuthenticationRule),
            Box::new(OrderSizeLimitRule {
                min: cfg.min_order_qty,
                max: cfg.max_order_qty,
            }),
            Box::new(PriceLimitRule {
                min: cfg.min_price,
                max: cfg.max_price,
            }),
            Box::new(TradingHoursRule {
                open_hour: cfg.open_hour,
                close_hour: cfg.close_hour,
            }),
            Box::new(SymbolWhitelistRule {
                whitelist: cfg.symbol_whitelist,
            }),
            Box::new(CancelPermissionRule),
            Box::new(ModifyPermissionRule),
        ])
    }

    /// Rules applicable to the given message type, in registration order.
    pub fn applicable<'a>(
        &'a self,
        msg_type: &'a str,
    ) -> impl Iterator<Item = &'a dyn ComplianceRule> + 'a {
        self.rules
            .iter()
            .map(Box::as_ref)
            .filter(move |r| r.applies_to(msg_type))
    }

    /// Union of all applicable rules' failure details.
    pub fn evaluate(&self, message: &FixMessage, context: &ValidationContext) -> Vec<String> {
        let Some(t) = message.msg_type() else {
            return vec!["MsgType missing; no compliance rules applicable".to_string()];
        };

        let mut details = Vec::new();
        for rule in self.applicable(t) {
            let result = rule.validate(message, context);
            if !result.valid {
                details.extend(result.details);
            }
        }
        details
    }
}

// ---------------------------------------------------------------------------
// ComplianceValidator
// ---------------------------------------------------------------------------

/// Priority 6. Any single failing rule makes the overall result invalid.
pub struct ComplianceValidator {
    rules: ComplianceRuleSet,
}

impl ComplianceValidator {
    pub fn new(rules: ComplianceRuleSet) -> Self {
        Self { rules }
    }
}

impl Validator for ComplianceValidator {
    fn validate(&self, message: &FixMessage, context: &ValidationContext) -> ValidationResult {
        let details = self.rules.evaluate(message, context);
        ValidationResult::from_details(Severity::Business, "Compliance validation failed", details)
    }

    fn name(&self) -> &'static str {
        "ComplianceValidator"
    }

    fn priority(&self) -> u32 {
        6
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
