//! Domain error types
//!
//! Errors raised by domain building blocks: broken business rules, failed
//! enumeration lookups and general invariant failures.

use std::fmt;

use thiserror::Error;

/// A broken business rule
///
/// Carries the rule's message plus an optional machine-readable code and
/// positional parameters for message templating.
///
/// # Example
///
/// ```rust
/// use audited_repository::domain::RuleViolation;
///
/// let violation = RuleViolation::new("Order must have at least one line")
///     .with_code("ORDER_EMPTY")
///     .with_parameters(["ord_123"]);
///
/// assert_eq!(violation.code.as_deref(), Some("ORDER_EMPTY"));
/// assert_eq!(violation.parameters, vec!["ord_123".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    /// Human-readable rule message
    pub message: String,
    /// Optional machine-readable code
    pub code: Option<String>,
    /// Optional parameters referenced by the message
    pub parameters: Vec<String>,
}

impl RuleViolation {
    /// Create a violation carrying only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            parameters: Vec::new(),
        }
    }

    /// Attach a machine-readable code
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach message parameters
    #[must_use]
    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(ref code) => write!(f, "{} [{}]", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Which key an enumeration lookup used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey {
    /// Lookup by numeric id
    Value,
    /// Lookup by case-insensitive name
    Name,
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => write!(f, "value"),
            Self::Name => write!(f, "name"),
        }
    }
}

/// Errors raised by the domain layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A business rule was broken
    #[error("Domain rule violated: {0}")]
    RuleViolation(RuleViolation),

    /// No enumeration instance matched the lookup
    #[error("'{key}' is not a valid {lookup} in {type_name}")]
    NotFound {
        /// Enumeration type that was searched
        type_name: &'static str,
        /// Whether the id or the name was used
        lookup: LookupKey,
        /// The key that failed to match
        key: String,
    },

    /// A general domain invariant failed
    #[error("Domain invariant failed: {message}")]
    Invariant {
        /// Human-readable message
        message: String,
        /// Optional machine-readable code
        code: Option<String>,
    },
}

impl DomainError {
    /// Create a general invariant failure
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
            code: None,
        }
    }

    /// Returns the rule violation when this error is one
    pub fn as_rule_violation(&self) -> Option<&RuleViolation> {
        match self {
            Self::RuleViolation(violation) => Some(violation),
            _ => None,
        }
    }

    /// Check whether this is a "not found" lookup failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<RuleViolation> for DomainError {
    fn from(violation: RuleViolation) -> Self {
        Self::RuleViolation(violation)
    }
}
