//! Repository error types
//!
//! This module provides structured error types for repository operations,
//! allowing fine-grained error handling and meaningful error messages.
//!
//! Stores and actor resolvers return [`RepositoryError`] directly, so the
//! engine hands their failures to the caller untouched.
//!
//! # Example
//!
//! ```rust
//! use audited_repository::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
//!
//! let error = RepositoryError::not_found(RepositoryOperation::GetById, "Order", "ord_123");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert!(error.entity_id.is_some());
//! ```

use std::fmt;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Reading every live row
    GetAll,
    /// Reading one row by key
    GetById,
    /// Reading one page of a filtered, searched, sorted query
    GetPaged,
    /// Checking whether a live row exists
    Exists,
    /// Reading the first row matching a predicate
    FirstOrDefault,
    /// Reading every row matching a predicate
    Find,
    /// Staging one new entity
    Add,
    /// Staging several new entities
    AddMany,
    /// Staging one modified entity
    Update,
    /// Staging several modified entities
    UpdateMany,
    /// Staging one removal
    Remove,
    /// Staging several removals
    RemoveMany,
    /// Staging a removal by key
    RemoveByKey,
    /// Flushing staged changes
    SaveChanges,
    /// Store-level query evaluation
    Query,
    /// Store-level staging of writes
    Stage,
    /// Store-level commit
    Commit,
    /// Resolving the current actor
    ResolveActor,
    /// Binding a repository to an entity type
    Bind,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetAll => write!(f, "get_all"),
            Self::GetById => write!(f, "get_by_id"),
            Self::GetPaged => write!(f, "get_paged"),
            Self::Exists => write!(f, "exists"),
            Self::FirstOrDefault => write!(f, "first_or_default"),
            Self::Find => write!(f, "find"),
            Self::Add => write!(f, "add"),
            Self::AddMany => write!(f, "add_many"),
            Self::Update => write!(f, "update"),
            Self::UpdateMany => write!(f, "update_many"),
            Self::Remove => write!(f, "remove"),
            Self::RemoveMany => write!(f, "remove_many"),
            Self::RemoveByKey => write!(f, "remove_by_key"),
            Self::SaveChanges => write!(f, "save_changes"),
            Self::Query => write!(f, "query"),
            Self::Stage => write!(f, "stage"),
            Self::Commit => write!(f, "commit"),
            Self::ResolveActor => write!(f, "resolve_actor"),
            Self::Bind => write!(f, "bind"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// No live row matched a keyed lookup or removal
    NotFound,
    /// A row with the same key already exists
    AlreadyExists,
    /// A filter or sort named a field the entity type does not declare
    InvalidField,
    /// Malformed paging parameters
    InvalidArgument,
    /// Storage constraint violation
    ConstraintViolation,
    /// Failed to reach the storage backend
    ConnectionFailed,
    /// Operation timed out in the storage backend
    Timeout,
    /// Other storage backend failure
    StorageError,
    /// The caller cancelled the operation
    Cancelled,
    /// Other unclassified error
    Other,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::InvalidField => write!(f, "invalid_field"),
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::StorageError => write!(f, "storage_error"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured repository error with operation context
///
/// Provides detailed information about what operation failed, why it failed,
/// and which entity was involved.
///
/// # Example
///
/// ```rust
/// use audited_repository::repository::{RepositoryError, RepositoryOperation};
///
/// let error = RepositoryError::invalid_field(RepositoryOperation::GetPaged, "Order", "colour");
/// assert_eq!(
///     error.to_string(),
///     "Repository invalid_field error during get_paged: Unknown field 'colour' [Order]"
/// );
/// assert!(!error.is_retriable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Order", "Customer")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(
        operation: RepositoryOperation,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::NotFound, "Entity not found")
            .with_entity(entity_type, entity_id)
    }

    /// Create a "not found" error for a predicate lookup that has no key
    pub fn no_match(operation: RepositoryOperation, entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            ..Self::new(
                operation,
                RepositoryErrorKind::NotFound,
                "No entity matched the predicate",
            )
        }
    }

    /// Create an "already exists" error with entity context
    pub fn already_exists(
        operation: RepositoryOperation,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self::new(
            operation,
            RepositoryErrorKind::AlreadyExists,
            "Entity already exists",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create an error for an unknown filter or sort field
    pub fn invalid_field(
        operation: RepositoryOperation,
        entity_type: impl Into<String>,
        field: &str,
    ) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            ..Self::new(
                operation,
                RepositoryErrorKind::InvalidField,
                format!("Unknown field '{}'", field),
            )
        }
    }

    /// Create an error for malformed arguments such as paging parameters
    pub fn invalid_argument(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::InvalidArgument, message)
    }

    /// Create a constraint violation error
    pub fn constraint_violation(
        operation: RepositoryOperation,
        message: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::ConstraintViolation, message)
    }

    /// Create a connection failed error
    pub fn connection_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ConnectionFailed, message)
    }

    /// Create a timeout error
    pub fn timeout(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Timeout, message)
    }

    /// Create a storage backend error
    pub fn storage(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::StorageError, message)
    }

    /// Create a cancellation error
    pub fn cancelled(operation: RepositoryOperation) -> Self {
        Self::new(
            operation,
            RepositoryErrorKind::Cancelled,
            "Operation was cancelled",
        )
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    ///
    /// The repository itself never retries; this is a hint for callers.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout
        )
    }

    /// Check whether this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.kind == RepositoryErrorKind::NotFound
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{}: {}]", entity_type, entity_id)?,
            (Some(entity_type), None) => write!(f, " [{}]", entity_type)?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}
