//! Crate-level error type
//!
//! Repository and domain operations return their own structured errors.
//! [`Error`] unifies them with configuration and startup failures for
//! application code that wants a single error type.

use thiserror::Error;

use crate::domain::DomainError;
use crate::repository::RepositoryError;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Structured repository error with operation context
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Domain rule or invariant failure
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the failed operation may succeed
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Repository(err) if err.is_retriable())
    }
}

// Manual From implementation for the boxed variant
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}
