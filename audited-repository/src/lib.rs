//! # audited-repository
//!
//! Generic, audit-aware persistence for domain-driven services. One engine
//! serves every entity type that declares which audit capabilities it
//! carries and which of its fields may be filtered, searched and sorted.
//!
//! ## Features
//!
//! - **Audit trail**: creation stamps cascade over owned entity graphs; updates stamp the root
//! - **Soft delete**: deletion-audited rows are flagged and hidden from standard reads
//! - **Dynamic paging**: filter, search and sort by field name with stable row counts
//! - **Unit of work**: writes stage until `save_changes`, or commit immediately with `auto_save`
//! - **Domain building blocks**: entities, aggregate roots, business rules, specifications,
//!   notifications and enumeration value types
//! - **Cancellation**: every repository call honors a `CancellationToken`
//!
//! ## Example
//!
//! ```rust,ignore
//! use audited_repository::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let repo = GenericRepository::bind(
//!         InMemoryStore::<Customer>::new(),
//!         StaticActor::new("system".to_string()),
//!         config.repository_options(),
//!     )?;
//!
//!     let cancel = CancellationToken::new();
//!     repo.add(customer, true, &cancel).await?;
//!
//!     let page = repo
//!         .get_paged(&PagedRequest::new().with_search("acme"), &cancel)
//!         .await?;
//!     tracing::info!(rows = page.row_count, "Customers matching 'acme'");
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod ids;
pub mod observability;
pub mod repository;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, RepositoryConfig, ServiceConfig};

    pub use crate::error::{Error, Result};

    pub use crate::ids::{EntityId, EntityIdError, IdPrefix};

    pub use crate::observability::{init_tracing, shutdown_tracing};

    pub use crate::domain::{
        AggregateRoot, AuditCapabilities, AuditNode, Auditable, BusinessRuleValidator,
        CreationAudit, DeletionAudit, DomainError, DomainEvent, DomainEvents, DomainRule, Entity,
        Enumeration, ModificationAudit, Notification, RuleViolation, Specification,
        SpecificationExt,
    };

    pub use crate::repository::{
        ActorResolver, AggregateRepository, Clock, EntityRepository, FieldRegistryBuilder,
        GenericRepository, InMemoryStore, OrderDirection, PagedRequest, PagedResult, Queryable,
        RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryOptions,
        RepositoryResult, StaticActor, Store, SystemClock,
    };

    pub use crate::enumeration;

    // Re-export cancellation
    pub use tokio_util::sync::CancellationToken;

    // Re-export tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    pub use serde::{Deserialize, Serialize};

    pub use chrono::{DateTime, Utc};
}
