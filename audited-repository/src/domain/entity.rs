//! Entity and aggregate root abstractions
//!
//! Every persisted business object implements [`Entity`]: a caller-assigned
//! identity plus a list of pending [`DomainEvent`]s. Aggregate roots are
//! entities that mark a consistency boundary and are the only unit the
//! aggregate-flavored repository accepts.
//!
//! # Example
//!
//! ```rust
//! use audited_repository::domain::{AggregateRoot, DomainEvents, Entity};
//!
//! #[derive(Debug, Clone)]
//! struct Customer {
//!     id: u64,
//!     events: DomainEvents,
//! }
//!
//! impl Entity for Customer {
//!     type Id = u64;
//!
//!     fn id(&self) -> &u64 {
//!         &self.id
//!     }
//!
//!     fn events(&self) -> &DomainEvents {
//!         &self.events
//!     }
//!
//!     fn events_mut(&mut self) -> &mut DomainEvents {
//!         &mut self.events
//!     }
//! }
//!
//! impl AggregateRoot for Customer {}
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Something that happened inside an aggregate that other parts of the
/// application may react to
pub trait DomainEvent: fmt::Debug + Send + Sync + 'static {
    /// Stable event name, e.g. `"order.placed"`
    fn event_name(&self) -> &'static str;

    /// When the event happened
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Ordered list of events raised by an entity and not yet dispatched
///
/// Events accumulate until the owning application layer drains them with
/// [`take`](Self::take) or [`clear`](Self::clear). Repositories never touch
/// this list.
#[derive(Debug, Clone, Default)]
pub struct DomainEvents(Vec<Arc<dyn DomainEvent>>);

impl DomainEvents {
    /// Create an empty event list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn record(&mut self, event: impl DomainEvent) {
        self.0.push(Arc::new(event));
    }

    /// Iterate over pending events in the order they were raised
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DomainEvent>> {
        self.0.iter()
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no events are pending
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove and return all pending events
    pub fn take(&mut self) -> Vec<Arc<dyn DomainEvent>> {
        std::mem::take(&mut self.0)
    }

    /// Drop all pending events
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// A persisted business object with identity
///
/// The identity type must be totally ordered: repositories fall back to
/// ascending identity order whenever a caller does not ask for one.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identity type
    type Id: Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// The entity's identity
    fn id(&self) -> &Self::Id;

    /// Pending domain events
    fn events(&self) -> &DomainEvents;

    /// Mutable access to pending domain events
    fn events_mut(&mut self) -> &mut DomainEvents;

    /// Raise a domain event
    fn add_domain_event(&mut self, event: impl DomainEvent) {
        self.events_mut().record(event);
    }

    /// Discard all pending domain events
    fn clear_domain_events(&mut self) {
        self.events_mut().clear();
    }
}

/// Marker for entities that form a consistency boundary
pub trait AggregateRoot: Entity {}

/// Short, unqualified type name used in logs and error messages
pub(crate) fn entity_name<E: ?Sized>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
