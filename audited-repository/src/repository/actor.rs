//! Actor resolution
//!
//! Audited writes record who performed them. The repository asks an
//! [`ActorResolver`] for the current actor at most once per top-level write
//! and stamps every touched entity with that single answer.

use std::fmt;
use std::future::Future;

use super::traits::RepositoryResult;

/// Source of the identity performing the current operation
pub trait ActorResolver: Send + Sync {
    /// Identity type of the acting user or system
    type ActorId: Clone + fmt::Debug + Send + Sync + 'static;

    /// Identity of the current actor
    fn current_actor(&self) -> impl Future<Output = RepositoryResult<Self::ActorId>> + Send;
}

/// Resolver that always answers with the same actor
///
/// Suits background jobs and tests.
///
/// # Example
///
/// ```rust
/// use audited_repository::repository::StaticActor;
///
/// let resolver = StaticActor::new("system".to_string());
/// assert_eq!(resolver.actor(), "system");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticActor<A> {
    actor: A,
}

impl<A> StaticActor<A> {
    /// Resolver for `actor`
    pub fn new(actor: A) -> Self {
        Self { actor }
    }

    /// The actor this resolver answers with
    pub fn actor(&self) -> &A {
        &self.actor
    }
}

impl<A> ActorResolver for StaticActor<A>
where
    A: Clone + fmt::Debug + Send + Sync + 'static,
{
    type ActorId = A;

    async fn current_actor(&self) -> RepositoryResult<A> {
        Ok(self.actor.clone())
    }
}
