//! Message accumulator for fail-all validation
//!
//! [`BusinessRuleValidator`](super::BusinessRuleValidator) stops at the first
//! broken rule. When a caller needs every violation at once it collects them
//! into a [`Notification`] instead.

use super::rules::DomainRule;

/// Ordered list of validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    messages: Vec<String>,
}

impl Notification {
    /// Create an empty notification
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate every rule and collect the messages of the broken ones
    ///
    /// # Example
    ///
    /// ```rust
    /// use audited_repository::domain::{DomainRule, Notification};
    ///
    /// struct Broken(&'static str);
    ///
    /// impl DomainRule for Broken {
    ///     fn message(&self) -> String { self.0.to_string() }
    ///     fn is_broken(&self) -> bool { true }
    /// }
    ///
    /// let rules: [&dyn DomainRule; 2] = [&Broken("first"), &Broken("second")];
    /// let notification = Notification::from_rules(rules);
    /// assert_eq!(notification.messages(), ["first", "second"]);
    /// ```
    pub fn from_rules<'a, I>(rules: I) -> Self
    where
        I: IntoIterator<Item = &'a dyn DomainRule>,
    {
        let messages = rules
            .into_iter()
            .filter(|rule| rule.is_broken())
            .map(|rule| rule.message())
            .collect();
        Self { messages }
    }

    /// Append a message
    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Messages in the order they were added
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Whether any message was added
    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }
}
