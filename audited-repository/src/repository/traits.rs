//! Repository trait definitions
//!
//! This module provides the CRUD façade traits using RPITIT (Return Position
//! Impl Trait In Traits), so implementations write plain `async fn`.
//!
//! # Overview
//!
//! - [`EntityRepository`]: reads, paging and audited writes for one entity type
//! - [`AggregateRepository`]: the same façade, restricted to aggregate roots
//!
//! Every mutating method takes an `auto_save` flag. When true the write is
//! committed before the call returns; when false it stays staged until
//! [`save_changes`](EntityRepository::save_changes), so several calls can
//! form one unit of work.
//!
//! # Example
//!
//! ```rust,ignore
//! use audited_repository::repository::{EntityRepository, PagedRequest};
//!
//! let order = repo.add(order, false, &cancel).await?;
//! repo.add_many(lines, false, &cancel).await?;
//! repo.save_changes(&cancel).await?;
//!
//! let page = repo
//!     .get_paged(&PagedRequest::new().with_search("acme"), &cancel)
//!     .await?;
//! ```

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::domain::{AggregateRoot, Entity, Specification};

use super::error::RepositoryError;
use super::pagination::{PagedRequest, PagedResult};

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// CRUD façade for entity type `E`
///
/// Standard reads never return soft-deleted rows.
pub trait EntityRepository<E: Entity>: Send + Sync {
    /// Every live row, ascending by identity
    ///
    /// Returns an empty list rather than failing when nothing matches.
    fn get_all(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// The live row with this identity
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` with `NotFound` kind if no live row matches.
    fn get_by_id(
        &self,
        id: &E::Id,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// One page of live rows, filtered, searched and sorted
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a page or page size below 1, `InvalidField` for
    /// an unknown filter or sort field.
    fn get_paged(
        &self,
        request: &PagedRequest,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<PagedResult<E>>> + Send;

    /// Whether a live row with this identity exists
    fn exists(
        &self,
        id: &E::Id,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// The first live row, by identity, satisfying `predicate`
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` with `NotFound` kind if no live row matches.
    fn first_or_default<P>(
        &self,
        predicate: P,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<E>> + Send
    where
        P: Specification<E> + 'static;

    /// Every live row satisfying `predicate`, ascending by identity
    fn find<P>(
        &self,
        predicate: P,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send
    where
        P: Specification<E> + 'static;

    /// Stamp creation audit over `entity`'s owned graph and stage its insert
    ///
    /// Returns the stamped entity.
    fn add(
        &self,
        entity: E,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// [`add`](Self::add) for several entities with one actor and instant
    ///
    /// Either every entity is staged or none is.
    fn add_many(
        &self,
        entities: Vec<E>,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Stamp modification audit on `entity` and stage its update
    ///
    /// Owned entities are not stamped. Returns the stamped entity.
    fn update(
        &self,
        entity: E,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// [`update`](Self::update) for several entities with one actor and instant
    fn update_many(
        &self,
        entities: Vec<E>,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Soft-delete `entity` when its type is deletion-audited, otherwise stage
    /// its physical removal
    fn remove(
        &self,
        entity: E,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// [`remove`](Self::remove) for several entities with one actor and instant
    fn remove_many(
        &self,
        entities: Vec<E>,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Look up the live row with this identity and remove it
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` with `NotFound` kind if no live row matches.
    fn remove_by_key(
        &self,
        id: &E::Id,
        auto_save: bool,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Commit every staged write and return how many were applied
    fn save_changes(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<usize>> + Send;
}

/// CRUD façade restricted to aggregate roots
///
/// Every [`EntityRepository`] over an aggregate root is one.
pub trait AggregateRepository<E: AggregateRoot>: EntityRepository<E> {}

impl<E: AggregateRoot, R: EntityRepository<E>> AggregateRepository<E> for R {}
