//! Audited generic repository
//!
//! This module provides a CRUD façade over any entity type that declares its
//! audit capabilities and queryable fields. It applies creation, modification
//! and soft-delete auditing transparently, hides soft-deleted rows from
//! standard reads, and serves dynamic paged queries.
//!
//! # Features
//!
//! - **Generic CRUD**: [`EntityRepository`] and [`AggregateRepository`] façades
//! - **Audit stamping**: [`AuditPolicy`] cascades creation stamps over owned graphs
//! - **Soft delete**: deletion-audited types are flagged, never removed
//! - **Dynamic paging**: [`PagedRequest`] filters, searches and sorts by field name
//! - **Unit of work**: writes stay staged until committed through a [`Store`]
//!
//! # Example
//!
//! ```rust,ignore
//! use audited_repository::repository::{
//!     EntityRepository, GenericRepository, InMemoryStore, PagedRequest, StaticActor,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! let repo = GenericRepository::new(InMemoryStore::new(), StaticActor::new(user_id))?;
//! let cancel = CancellationToken::new();
//!
//! repo.add(customer, true, &cancel).await?;
//! let page = repo
//!     .get_paged(
//!         &PagedRequest::new()
//!             .with_page_size(10)
//!             .with_order_by("name")
//!             .with_search("acme"),
//!         &cancel,
//!     )
//!     .await?;
//! println!("{} of {} rows", page.len(), page.row_count);
//! ```

mod actor;
mod clock;
mod engine;
mod error;
mod fields;
mod memory;
mod pagination;
mod policy;
mod query;
mod store;
mod traits;

pub use actor::{ActorResolver, StaticActor};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{GenericRepository, RepositoryOptions};
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use fields::{Field, FieldKind, FieldRegistry, FieldRegistryBuilder, FieldValue, Queryable};
pub use memory::InMemoryStore;
pub use pagination::{
    OrderDirection, PagedRequest, PagedResult, Pagination, DEFAULT_PAGE_SIZE,
};
pub use policy::{AuditPolicy, DeleteAction};
pub use query::{Criterion, Order, Query};
pub use store::{Change, Store};
pub use traits::{AggregateRepository, EntityRepository, RepositoryResult};
