//! In-memory reference store
//!
//! [`InMemoryStore`] keeps committed rows in identity order and staged writes
//! in a pending list. It evaluates [`Query`] criteria directly and is what
//! the engine's tests run against.
//!
//! # Example
//!
//! ```rust,ignore
//! use audited_repository::repository::{InMemoryStore, Store};
//!
//! let store = InMemoryStore::with_rows(vec![order_1, order_2]);
//! store.stage_insert(order_3, &cancel).await?;
//! assert_eq!(store.len().await, 2);
//! store.commit(&cancel).await?;
//! assert_eq!(store.len().await, 3);
//! ```

use std::collections::BTreeMap;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::domain::{entity_name, Entity};

use super::error::{RepositoryError, RepositoryOperation};
use super::query::Query;
use super::store::{Change, Store};
use super::traits::RepositoryResult;

/// Store backed by a `BTreeMap` keyed by identity
#[derive(Debug)]
pub struct InMemoryStore<E: Entity> {
    rows: RwLock<BTreeMap<E::Id, E>>,
    pending: Mutex<Vec<Change<E>>>,
}

impl<E: Entity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }
}

impl<E: Entity> InMemoryStore<E> {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose committed state is `rows`
    ///
    /// A later row replaces an earlier one with the same identity.
    pub fn with_rows(rows: impl IntoIterator<Item = E>) -> Self {
        let rows = rows.into_iter().map(|e| (e.id().clone(), e)).collect();
        Self {
            rows: RwLock::new(rows),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Committed row with this identity, soft-deleted or not
    pub async fn peek(&self, id: &E::Id) -> Option<E> {
        self.rows.read().await.get(id).cloned()
    }

    /// Number of committed rows, soft-deleted included
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Whether no row is committed
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Number of staged writes awaiting commit
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

fn ensure_live(cancel: &CancellationToken, operation: RepositoryOperation) -> RepositoryResult<()> {
    if cancel.is_cancelled() {
        Err(RepositoryError::cancelled(operation))
    } else {
        Ok(())
    }
}

fn apply<E: Entity>(rows: &mut BTreeMap<E::Id, E>, change: Change<E>) -> RepositoryResult<()> {
    match change {
        Change::Insert(entity) => {
            if rows.contains_key(entity.id()) {
                return Err(RepositoryError::already_exists(
                    RepositoryOperation::Commit,
                    entity_name::<E>(),
                    entity.id().to_string(),
                ));
            }
            rows.insert(entity.id().clone(), entity);
        }
        Change::Update(entity) => match rows.get_mut(entity.id()) {
            Some(row) => *row = entity,
            None => {
                return Err(RepositoryError::not_found(
                    RepositoryOperation::Commit,
                    entity_name::<E>(),
                    entity.id().to_string(),
                ))
            }
        },
        Change::Remove(id) => {
            if rows.remove(&id).is_none() {
                return Err(RepositoryError::not_found(
                    RepositoryOperation::Commit,
                    entity_name::<E>(),
                    id.to_string(),
                ));
            }
        }
    }
    Ok(())
}

impl<E: Entity> Store<E> for InMemoryStore<E> {
    async fn count(&self, query: &Query<E>, cancel: &CancellationToken) -> RepositoryResult<u64> {
        ensure_live(cancel, RepositoryOperation::Query)?;
        let rows = self.rows.read().await;
        Ok(query.count(rows.values()))
    }

    async fn fetch(&self, query: &Query<E>, cancel: &CancellationToken) -> RepositoryResult<Vec<E>> {
        ensure_live(cancel, RepositoryOperation::Query)?;
        let rows = self.rows.read().await;
        Ok(query.evaluate(rows.values()))
    }

    async fn stage(&self, changes: Vec<Change<E>>, cancel: &CancellationToken) -> RepositoryResult<()> {
        ensure_live(cancel, RepositoryOperation::Stage)?;
        let mut pending = self.pending.lock().await;
        tracing::debug!(
            entity = entity_name::<E>(),
            staged = changes.len(),
            pending = pending.len() + changes.len(),
            "Staged changes"
        );
        pending.extend(changes);
        Ok(())
    }

    async fn commit(&self, cancel: &CancellationToken) -> RepositoryResult<usize> {
        ensure_live(cancel, RepositoryOperation::Commit)?;
        let mut pending = self.pending.lock().await;
        let changes = std::mem::take(&mut *pending);
        if changes.is_empty() {
            return Ok(0);
        }

        let mut rows = self.rows.write().await;
        let mut next = rows.clone();
        let applied = changes.len();
        for change in changes {
            if let Err(error) = apply(&mut next, change) {
                tracing::debug!(
                    entity = entity_name::<E>(),
                    error = %error,
                    "Commit rejected, staged changes dropped"
                );
                return Err(error);
            }
        }
        *rows = next;

        tracing::debug!(entity = entity_name::<E>(), applied, "Committed staged changes");
        Ok(applied)
    }
}
