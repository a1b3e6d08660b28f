//! Audit capabilities
//!
//! An entity type opts into any combination of three independent audit
//! capabilities by embedding the matching field group and declaring it in
//! [`Auditable::CAPABILITIES`]:
//!
//! - [`CreationAudit`]: creation time and creator
//! - [`ModificationAudit`]: last modification time and modifier
//! - [`DeletionAudit`]: soft-delete flag, deletion time and deleter
//!
//! Capabilities are a property of the type, not of an instance. The
//! repository reads them once when it is bound and treats them as fixed.
//!
//! Entities that own other entities expose them through
//! [`Auditable::owned_mut`] so creation stamps can cascade over the whole
//! owned graph.
//!
//! # Example
//!
//! ```rust
//! use audited_repository::domain::{
//!     AuditCapabilities, Auditable, CreationAudit, DeletionAudit, DomainEvents, Entity,
//! };
//!
//! #[derive(Debug, Clone)]
//! struct Invoice {
//!     id: u64,
//!     created: CreationAudit<String>,
//!     deleted: DeletionAudit<String>,
//!     events: DomainEvents,
//! }
//!
//! impl Entity for Invoice {
//!     type Id = u64;
//!     fn id(&self) -> &u64 { &self.id }
//!     fn events(&self) -> &DomainEvents { &self.events }
//!     fn events_mut(&mut self) -> &mut DomainEvents { &mut self.events }
//! }
//!
//! impl Auditable for Invoice {
//!     type ActorId = String;
//!     const CAPABILITIES: AuditCapabilities = AuditCapabilities::NONE.with_creation().with_deletion();
//!
//!     fn creation_audit(&self) -> Option<&CreationAudit<String>> { Some(&self.created) }
//!     fn creation_audit_mut(&mut self) -> Option<&mut CreationAudit<String>> { Some(&mut self.created) }
//!     fn deletion_audit(&self) -> Option<&DeletionAudit<String>> { Some(&self.deleted) }
//!     fn deletion_audit_mut(&mut self) -> Option<&mut DeletionAudit<String>> { Some(&mut self.deleted) }
//! }
//!
//! assert!(Invoice::CAPABILITIES.deletion);
//! assert!(!Invoice::CAPABILITIES.modification);
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::Entity;

/// Creation time and creator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreationAudit<A> {
    /// When the entity was created
    pub creation_time: DateTime<Utc>,
    /// Who created the entity
    pub creator_id: A,
}

impl<A> CreationAudit<A> {
    /// Creation audit for `creator_id` at the current time
    ///
    /// The repository overwrites both fields when the entity is added.
    pub fn new(creator_id: A) -> Self {
        Self {
            creation_time: Utc::now(),
            creator_id,
        }
    }
}

/// Last modification time and modifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationAudit<A> {
    /// When the entity was last modified
    pub last_modification_time: Option<DateTime<Utc>>,
    /// Who last modified the entity
    pub last_modifier_id: Option<A>,
}

impl<A> Default for ModificationAudit<A> {
    fn default() -> Self {
        Self {
            last_modification_time: None,
            last_modifier_id: None,
        }
    }
}

/// Soft-delete flag, deletion time and deleter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionAudit<A> {
    /// Whether the entity is soft-deleted
    pub is_deleted: bool,
    /// When the entity was soft-deleted
    pub deletion_time: Option<DateTime<Utc>>,
    /// Who soft-deleted the entity
    pub deleter_id: Option<A>,
}

impl<A> Default for DeletionAudit<A> {
    fn default() -> Self {
        Self {
            is_deleted: false,
            deletion_time: None,
            deleter_id: None,
        }
    }
}

/// Which audit capabilities an entity type declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuditCapabilities {
    /// Creation time and creator are recorded
    pub creation: bool,
    /// Last modification time and modifier are recorded
    pub modification: bool,
    /// Removal is a soft delete
    pub deletion: bool,
}

impl AuditCapabilities {
    /// No audit capability
    pub const NONE: Self = Self {
        creation: false,
        modification: false,
        deletion: false,
    };

    /// All three audit capabilities
    pub const FULL: Self = Self {
        creation: true,
        modification: true,
        deletion: true,
    };

    /// Add the creation capability
    #[must_use]
    pub const fn with_creation(mut self) -> Self {
        self.creation = true;
        self
    }

    /// Add the modification capability
    #[must_use]
    pub const fn with_modification(mut self) -> Self {
        self.modification = true;
        self
    }

    /// Add the deletion capability
    #[must_use]
    pub const fn with_deletion(mut self) -> Self {
        self.deletion = true;
        self
    }

    /// Whether any capability is declared
    pub const fn any(&self) -> bool {
        self.creation || self.modification || self.deletion
    }
}

impl fmt::Display for AuditCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::with_capacity(3);
        if self.creation {
            names.push("creation");
        }
        if self.modification {
            names.push("modification");
        }
        if self.deletion {
            names.push("deletion");
        }
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("+"))
        }
    }
}

/// An entity type's audit capabilities and owned graph
///
/// Accessors for a declared capability must return `Some`; accessors for
/// undeclared capabilities keep their `None` defaults.
pub trait Auditable: Entity {
    /// Identity type of the acting user or system
    type ActorId: Clone + fmt::Debug + Send + Sync + 'static;

    /// Capabilities declared by this type
    const CAPABILITIES: AuditCapabilities = AuditCapabilities::NONE;

    fn creation_audit(&self) -> Option<&CreationAudit<Self::ActorId>> {
        None
    }

    fn creation_audit_mut(&mut self) -> Option<&mut CreationAudit<Self::ActorId>> {
        None
    }

    fn modification_audit(&self) -> Option<&ModificationAudit<Self::ActorId>> {
        None
    }

    fn modification_audit_mut(&mut self) -> Option<&mut ModificationAudit<Self::ActorId>> {
        None
    }

    fn deletion_audit(&self) -> Option<&DeletionAudit<Self::ActorId>> {
        None
    }

    fn deletion_audit_mut(&mut self) -> Option<&mut DeletionAudit<Self::ActorId>> {
        None
    }

    /// Entities owned by this one, single-valued and collection-valued
    ///
    /// Creation stamps cascade into everything returned here, recursively.
    fn owned_mut(&mut self) -> Vec<&mut dyn AuditNode<Self::ActorId>> {
        Vec::new()
    }

    /// Whether this instance is currently soft-deleted
    fn is_deleted(&self) -> bool {
        self.deletion_audit().is_some_and(|d| d.is_deleted)
    }
}

/// Identity of a node in an owned entity graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    /// Concrete entity type
    pub type_name: &'static str,
    /// Rendered entity identity
    pub id: String,
}

/// Type-erased view of an [`Auditable`] entity used while walking an owned
/// graph whose nodes have different concrete types
pub trait AuditNode<A> {
    /// Identity of this node, unique across types
    fn node_key(&self) -> NodeKey;

    /// Creation field group, when the node's type declares it
    fn creation_slot(&mut self) -> Option<&mut CreationAudit<A>>;

    /// Directly owned children
    fn children(&mut self) -> Vec<&mut dyn AuditNode<A>>;
}

impl<T: Auditable> AuditNode<T::ActorId> for T {
    fn node_key(&self) -> NodeKey {
        NodeKey {
            type_name: std::any::type_name::<T>(),
            id: self.id().to_string(),
        }
    }

    fn creation_slot(&mut self) -> Option<&mut CreationAudit<T::ActorId>> {
        if T::CAPABILITIES.creation {
            self.creation_audit_mut()
        } else {
            None
        }
    }

    fn children(&mut self) -> Vec<&mut dyn AuditNode<T::ActorId>> {
        self.owned_mut()
    }
}

/// Actor and instant shared by every stamp of one repository operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditStamp<A> {
    /// Acting user or system
    pub actor: A,
    /// Instant captured once for the whole operation
    pub at: DateTime<Utc>,
}

impl<A> AuditStamp<A> {
    /// Create a stamp
    pub fn new(actor: A, at: DateTime<Utc>) -> Self {
        Self { actor, at }
    }
}

/// Check `creation_time <= last_modification_time <= deletion_time` for
/// whichever of the three timestamps are present
pub fn is_chronological<E: Auditable>(entity: &E) -> bool {
    let created = entity.creation_audit().map(|c| c.creation_time);
    let modified = entity
        .modification_audit()
        .and_then(|m| m.last_modification_time);
    let deleted = entity.deletion_audit().and_then(|d| d.deletion_time);

    let ordered = |earlier: Option<DateTime<Utc>>, later: Option<DateTime<Utc>>| match (earlier, later) {
        (Some(a), Some(b)) => a <= b,
        _ => true,
    };

    ordered(created, modified) && ordered(modified, deleted) && ordered(created, deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::DomainEvents;
    use chrono::Duration;

    #[derive(Debug, Clone)]
    struct Line {
        id: u32,
        created: CreationAudit<String>,
        events: DomainEvents,
    }

    impl Entity for Line {
        type Id = u32;
        fn id(&self) -> &u32 {
            &self.id
        }
        fn events(&self) -> &DomainEvents {
            &self.events
        }
        fn events_mut(&mut self) -> &mut DomainEvents {
            &mut self.events
        }
    }

    impl Auditable for Line {
        type ActorId = String;
        const CAPABILITIES: AuditCapabilities = AuditCapabilities::NONE.with_creation();

        fn creation_audit(&self) -> Option<&CreationAudit<String>> {
            Some(&self.created)
        }
        fn creation_audit_mut(&mut self) -> Option<&mut CreationAudit<String>> {
            Some(&mut self.created)
        }
    }

    #[derive(Debug, Clone)]
    struct Document {
        id: u32,
        created: CreationAudit<String>,
        modified: ModificationAudit<String>,
        deleted: DeletionAudit<String>,
        lines: Vec<Line>,
        events: DomainEvents,
    }

    impl Entity for Document {
        type Id = u32;
        fn id(&self) -> &u32 {
            &self.id
        }
        fn events(&self) -> &DomainEvents {
            &self.events
        }
        fn events_mut(&mut self) -> &mut DomainEvents {
            &mut self.events
        }
    }

    impl Auditable for Document {
        type ActorId = String;
        const CAPABILITIES: AuditCapabilities = AuditCapabilities::FULL;

        fn creation_audit(&self) -> Option<&CreationAudit<String>> {
            Some(&self.created)
        }
        fn creation_audit_mut(&mut self) -> Option<&mut CreationAudit<String>> {
            Some(&mut self.created)
        }
        fn modification_audit(&self) -> Option<&ModificationAudit<String>> {
            Some(&self.modified)
        }
        fn modification_audit_mut(&mut self) -> Option<&mut ModificationAudit<String>> {
            Some(&mut self.modified)
        }
        fn deletion_audit(&self) -> Option<&DeletionAudit<String>> {
            Some(&self.deleted)
        }
        fn deletion_audit_mut(&mut self) -> Option<&mut DeletionAudit<String>> {
            Some(&mut self.deleted)
        }
        fn owned_mut(&mut self) -> Vec<&mut dyn AuditNode<String>> {
            self.lines
                .iter_mut()
                .map(|line| line as &mut dyn AuditNode<String>)
                .collect()
        }
    }

    fn document() -> Document {
        Document {
            id: 1,
            created: CreationAudit::new("seed".to_string()),
            modified: ModificationAudit::default(),
            deleted: DeletionAudit::default(),
            lines: vec![Line {
                id: 10,
                created: CreationAudit::new("seed".to_string()),
                events: DomainEvents::new(),
            }],
            events: DomainEvents::new(),
        }
    }

    #[test]
    fn test_capabilities_display() {
        assert_eq!(AuditCapabilities::NONE.to_string(), "none");
        assert_eq!(
            AuditCapabilities::FULL.to_string(),
            "creation+modification+deletion"
        );
        assert_eq!(
            AuditCapabilities::NONE.with_deletion().to_string(),
            "deletion"
        );
    }

    #[test]
    fn test_capabilities_any() {
        assert!(!AuditCapabilities::NONE.any());
        assert!(AuditCapabilities::NONE.with_modification().any());
    }

    #[test]
    fn test_node_key_includes_type() {
        let doc = document();
        let doc_key = doc.node_key();
        let line_key = doc.lines[0].node_key();
        assert_eq!(doc_key.id, "1");
        assert_eq!(line_key.id, "10");
        assert_ne!(doc_key.type_name, line_key.type_name);
    }

    #[test]
    fn test_children_exposes_owned_entities() {
        let mut doc = document();
        let children = doc.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].node_key().id, "10");
    }

    #[test]
    fn test_is_deleted_reads_flag() {
        let mut doc = document();
        assert!(!doc.is_deleted());
        doc.deleted.is_deleted = true;
        assert!(doc.is_deleted());
    }

    #[test]
    fn test_is_chronological() {
        let mut doc = document();
        let created = doc.created.creation_time;
        assert!(is_chronological(&doc));

        doc.modified.last_modification_time = Some(created + Duration::seconds(5));
        doc.deleted.deletion_time = Some(created + Duration::seconds(10));
        assert!(is_chronological(&doc));

        doc.deleted.deletion_time = Some(created + Duration::seconds(1));
        assert!(!is_chronological(&doc));

        doc.modified.last_modification_time = None;
        assert!(is_chronological(&doc));

        doc.deleted.deletion_time = Some(created - Duration::seconds(1));
        assert!(!is_chronological(&doc));
    }

    #[test]
    fn test_default_field_groups_are_empty() {
        let modified: ModificationAudit<String> = ModificationAudit::default();
        let deleted: DeletionAudit<String> = DeletionAudit::default();
        assert!(modified.last_modification_time.is_none());
        assert!(modified.last_modifier_id.is_none());
        assert!(!deleted.is_deleted);
        assert!(deleted.deleter_id.is_none());
    }
}
