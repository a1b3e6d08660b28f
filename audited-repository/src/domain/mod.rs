//! Domain building blocks
//!
//! Base shapes shared by every business entity: identity and pending domain
//! events, audit capability field groups, business rules, specifications and
//! closed-set value types.

mod audit;
mod entity;
mod enumeration;
mod error;
mod notification;
mod rules;
mod specification;

pub use audit::{
    is_chronological, AuditCapabilities, AuditNode, AuditStamp, Auditable, CreationAudit,
    DeletionAudit, ModificationAudit, NodeKey,
};
pub use entity::{AggregateRoot, DomainEvent, DomainEvents, Entity};
pub use enumeration::{Enumeration, EnumerationRegistry};
#[doc(hidden)]
pub use enumeration::{ids_are_unique, names_are_unique};
pub use error::{DomainError, LookupKey, RuleViolation};
pub use notification::Notification;
pub use rules::{BusinessRuleValidator, DomainRule};
pub use specification::{And, Not, Or, Specification, SpecificationExt};

pub(crate) use entity::entity_name;
