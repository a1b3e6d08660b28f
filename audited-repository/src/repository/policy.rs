//! Soft-delete filtering and audit stamping for one entity type
//!
//! An [`AuditPolicy`] is built once when a repository is bound. It reads the
//! type's declared [`AuditCapabilities`] and from then on decides:
//!
//! - which rows standard reads may see ([`read_filter`](AuditPolicy::read_filter))
//! - how creation stamps cascade over the owned graph
//! - whether removal is a soft or a physical delete
//!
//! Every stamp of one top-level operation uses the same [`AuditStamp`].

use std::collections::HashSet;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};

use crate::domain::{entity_name, AuditCapabilities, AuditNode, AuditStamp, Auditable};

use super::query::Criterion;

/// What removing an entity does to its row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteAction {
    /// Mark the row deleted and keep it
    Soft,
    /// Physically remove the row
    Hard,
}

/// Capability-driven audit behavior for entity type `E`
#[derive(Debug, Clone, Copy)]
pub struct AuditPolicy<E> {
    capabilities: AuditCapabilities,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Auditable> AuditPolicy<E> {
    /// Read `E`'s capabilities
    pub fn bind() -> Self {
        let capabilities = E::CAPABILITIES;
        tracing::debug!(
            entity = entity_name::<E>(),
            capabilities = %capabilities,
            "Audit policy bound"
        );
        Self {
            capabilities,
            _entity: PhantomData,
        }
    }

    /// Capabilities this policy was bound with
    pub fn capabilities(&self) -> AuditCapabilities {
        self.capabilities
    }

    /// Criterion hiding soft-deleted rows, when `E` is deletion-audited
    pub fn read_filter(&self) -> Option<Criterion<E>> {
        self.capabilities
            .deletion
            .then_some(Criterion::NotDeleted(<E as Auditable>::is_deleted))
    }

    /// Whether standard reads may return `entity`
    pub fn is_visible(&self, entity: &E) -> bool {
        !(self.capabilities.deletion && entity.is_deleted())
    }

    /// What removing an entity does
    pub fn delete_action(&self) -> DeleteAction {
        if self.capabilities.deletion {
            DeleteAction::Soft
        } else {
            DeleteAction::Hard
        }
    }

    /// Stamp creation time and creator on `root` and everything it owns
    ///
    /// Walks the owned graph depth-first, parents before children. Each
    /// identity is visited once; a later node carrying an identity already
    /// seen is skipped together with its subtree. Nodes whose type is not
    /// creation-audited are walked but not stamped. Returns the number of
    /// distinct nodes visited.
    pub fn stamp_creation(&self, root: &mut E, stamp: &AuditStamp<E::ActorId>) -> usize {
        let mut visited = HashSet::new();
        let mut stack: Vec<&mut dyn AuditNode<E::ActorId>> = Vec::new();
        stack.push(root);

        while let Some(node) = stack.pop() {
            if !visited.insert(node.node_key()) {
                continue;
            }
            if let Some(creation) = node.creation_slot() {
                creation.creation_time = stamp.at;
                creation.creator_id = stamp.actor.clone();
            }
            stack.extend(node.children().into_iter().rev());
        }

        visited.len()
    }

    /// Stamp last modification time and modifier on `entity` only
    ///
    /// Owned entities are left untouched. The stamped time is never earlier
    /// than the creation time. Returns whether anything was stamped.
    pub fn stamp_modification(&self, entity: &mut E, stamp: &AuditStamp<E::ActorId>) -> bool {
        if !self.capabilities.modification {
            return false;
        }
        let at = not_before(stamp.at, creation_time(entity));
        match entity.modification_audit_mut() {
            Some(modification) => {
                modification.last_modification_time = Some(at);
                modification.last_modifier_id = Some(stamp.actor.clone());
                true
            }
            None => false,
        }
    }

    /// Mark `entity` deleted with deletion time and deleter
    ///
    /// The stamped time is never earlier than the creation or last
    /// modification time. Returns whether anything was stamped.
    pub fn stamp_deletion(&self, entity: &mut E, stamp: &AuditStamp<E::ActorId>) -> bool {
        if !self.capabilities.deletion {
            return false;
        }
        let modified = entity
            .modification_audit()
            .and_then(|m| m.last_modification_time);
        let at = not_before(not_before(stamp.at, creation_time(entity)), modified);
        match entity.deletion_audit_mut() {
            Some(deletion) => {
                deletion.is_deleted = true;
                deletion.deletion_time = Some(at);
                deletion.deleter_id = Some(stamp.actor.clone());
                true
            }
            None => false,
        }
    }
}

fn creation_time<E: Auditable>(entity: &E) -> Option<DateTime<Utc>> {
    if E::CAPABILITIES.creation {
        entity.creation_audit().map(|c| c.creation_time)
    } else {
        None
    }
}

fn not_before(at: DateTime<Utc>, floor: Option<DateTime<Utc>>) -> DateTime<Utc> {
    floor.map_or(at, |floor| at.max(floor))
}
