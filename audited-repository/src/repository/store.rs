//! Storage collaborator contract
//!
//! A [`Store`] holds the rows of one entity type. Reads see committed rows
//! only. Writes are staged and become visible together when
//! [`commit`](Store::commit) succeeds; a failed commit applies nothing.
//!
//! Every method takes a [`CancellationToken`]. Implementations should check
//! it before doing work and return a `Cancelled` error once it fires.
//!
//! Trait methods use RPITIT, so implementations can write plain `async fn`.
//!
//! # Example
//!
//! ```rust,ignore
//! use audited_repository::repository::{Change, Query, RepositoryResult, Store};
//! use tokio_util::sync::CancellationToken;
//!
//! struct OrderTable { pool: PgPool }
//!
//! impl Store<Order> for OrderTable {
//!     async fn count(&self, query: &Query<Order>, cancel: &CancellationToken) -> RepositoryResult<u64> {
//!         // Translate the criteria into a WHERE clause
//!         todo!()
//!     }
//!     // ... other methods
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::Entity;

use super::query::Query;
use super::traits::RepositoryResult;

/// One staged write
#[derive(Debug, Clone)]
pub enum Change<E: Entity> {
    /// Insert a row whose identity must not exist yet
    Insert(E),
    /// Replace a row whose identity must exist
    Update(E),
    /// Physically remove the row with this identity
    Remove(E::Id),
}

impl<E: Entity> Change<E> {
    /// Identity of the row this change touches
    pub fn id(&self) -> &E::Id {
        match self {
            Self::Insert(entity) | Self::Update(entity) => entity.id(),
            Self::Remove(id) => id,
        }
    }
}

/// Storage for the rows of one entity type
pub trait Store<E: Entity>: Send + Sync {
    /// Number of committed rows matching the query's criteria, ignoring paging
    fn count(
        &self,
        query: &Query<E>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Committed rows matching the query, ordered and paged
    fn fetch(
        &self,
        query: &Query<E>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Stage a batch of writes
    ///
    /// Either the whole batch is staged or, on error, none of it.
    fn stage(
        &self,
        changes: Vec<Change<E>>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Apply every staged write atomically and return how many were applied
    ///
    /// Fails with `AlreadyExists` when an insert targets an existing identity
    /// and `NotFound` when an update or removal targets a missing one. On
    /// failure the committed rows are unchanged and the staged batch is
    /// dropped.
    fn commit(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<usize>> + Send;

    /// Stage one insert
    fn stage_insert(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send {
        self.stage(vec![Change::Insert(entity)], cancel)
    }

    /// Stage one update
    fn stage_update(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send {
        self.stage(vec![Change::Update(entity)], cancel)
    }

    /// Stage one physical removal
    fn stage_remove(
        &self,
        id: E::Id,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send {
        self.stage(vec![Change::Remove(id)], cancel)
    }
}

impl<E: Entity, S: Store<E>> Store<E> for Arc<S> {
    fn count(
        &self,
        query: &Query<E>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send {
        (**self).count(query, cancel)
    }

    fn fetch(
        &self,
        query: &Query<E>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send {
        (**self).fetch(query, cancel)
    }

    fn stage(
        &self,
        changes: Vec<Change<E>>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send {
        (**self).stage(changes, cancel)
    }

    fn commit(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<usize>> + Send {
        (**self).commit(cancel)
    }
}
