//! Specification pattern
//!
//! A [`Specification`] answers whether a candidate satisfies some criteria.
//! Any `Fn(&T) -> bool` closure is a specification, and specifications
//! compose with [`and`](SpecificationExt::and), [`or`](SpecificationExt::or)
//! and [`not`](SpecificationExt::not). Repositories accept specifications as
//! the predicate of `find` and `first_or_default`.
//!
//! # Example
//!
//! ```rust
//! use audited_repository::domain::{Specification, SpecificationExt};
//!
//! let even = |n: &i32| n % 2 == 0;
//! let positive = |n: &i32| *n > 0;
//! let spec = even.and(positive);
//!
//! assert!(spec.is_satisfied_by(&4));
//! assert!(!spec.is_satisfied_by(&-4));
//! assert!(!spec.is_satisfied_by(&3));
//! ```

/// Criteria a candidate either satisfies or not
pub trait Specification<T: ?Sized>: Send + Sync {
    /// Whether `candidate` satisfies this specification
    fn is_satisfied_by(&self, candidate: &T) -> bool;
}

impl<T: ?Sized, F> Specification<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self(candidate)
    }
}

/// Both specifications hold
#[derive(Debug, Clone)]
pub struct And<A, B>(A, B);

/// Either specification holds
#[derive(Debug, Clone)]
pub struct Or<A, B>(A, B);

/// The specification does not hold
#[derive(Debug, Clone)]
pub struct Not<A>(A);

impl<T: ?Sized, A: Specification<T>, B: Specification<T>> Specification<T> for And<A, B> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.0.is_satisfied_by(candidate) && self.1.is_satisfied_by(candidate)
    }
}

impl<T: ?Sized, A: Specification<T>, B: Specification<T>> Specification<T> for Or<A, B> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.0.is_satisfied_by(candidate) || self.1.is_satisfied_by(candidate)
    }
}

impl<T: ?Sized, A: Specification<T>> Specification<T> for Not<A> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        !self.0.is_satisfied_by(candidate)
    }
}

/// Combinators for specifications
pub trait SpecificationExt<T: ?Sized>: Specification<T> + Sized {
    /// Satisfied when both `self` and `other` are
    fn and<S: Specification<T>>(self, other: S) -> And<Self, S> {
        And(self, other)
    }

    /// Satisfied when `self` or `other` is
    fn or<S: Specification<T>>(self, other: S) -> Or<Self, S> {
        Or(self, other)
    }

    /// Satisfied when `self` is not
    fn not(self) -> Not<Self> {
        Not(self)
    }
}

impl<T: ?Sized, S: Specification<T>> SpecificationExt<T> for S {}
