//! Business rule checking
//!
//! A [`DomainRule`] is a stateless predicate describing a business invariant.
//! [`BusinessRuleValidator`] evaluates rules before a state change is allowed
//! and stops at the first broken one.
//!
//! # Example
//!
//! ```rust
//! use audited_repository::domain::{BusinessRuleValidator, DomainRule};
//!
//! struct QuantityIsPositive(i64);
//!
//! impl DomainRule for QuantityIsPositive {
//!     fn message(&self) -> String {
//!         format!("Quantity must be positive, got {}", self.0)
//!     }
//!
//!     fn is_broken(&self) -> bool {
//!         self.0 <= 0
//!     }
//! }
//!
//! assert!(BusinessRuleValidator::check(&QuantityIsPositive(3)).is_ok());
//! assert!(BusinessRuleValidator::check(&QuantityIsPositive(0)).is_err());
//! ```

use super::error::{DomainError, RuleViolation};

/// A named, evaluable business invariant
pub trait DomainRule {
    /// Message reported when the rule is broken
    fn message(&self) -> String;

    /// Whether the invariant does not hold
    fn is_broken(&self) -> bool;

    /// Optional machine-readable code reported with the violation
    fn code(&self) -> Option<&str> {
        None
    }
}

/// Fail-fast rule checker
pub struct BusinessRuleValidator;

impl BusinessRuleValidator {
    /// Fail with [`DomainError::RuleViolation`] when `rule` is broken
    pub fn check(rule: &dyn DomainRule) -> Result<(), DomainError> {
        if !rule.is_broken() {
            return Ok(());
        }

        let mut violation = RuleViolation::new(rule.message());
        if let Some(code) = rule.code() {
            violation = violation.with_code(code);
        }
        tracing::debug!(rule = %violation, "Business rule broken");
        Err(DomainError::RuleViolation(violation))
    }

    /// Check rules in order, stopping at the first broken one
    ///
    /// Rules after the first broken rule are never evaluated.
    pub fn check_all<'a, I>(rules: I) -> Result<(), DomainError>
    where
        I: IntoIterator<Item = &'a dyn DomainRule>,
    {
        rules.into_iter().try_for_each(Self::check)
    }
}
