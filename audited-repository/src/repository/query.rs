//! Structured queries handed to a [`Store`](super::Store)
//!
//! A [`Query`] is a conjunction of [`Criterion`]s, an [`Order`] and optional
//! [`Pagination`]. Criteria keep field names next to their typed accessors,
//! so a SQL-backed store can translate them while an in-memory store calls
//! [`Query::evaluate`] directly.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::domain::{Entity, Specification};

use super::fields::Field;
use super::pagination::{OrderDirection, Pagination};

/// One restriction on the rows a query returns
pub enum Criterion<E: Entity> {
    /// Exclude soft-deleted rows; the function reports the deletion flag
    NotDeleted(fn(&E) -> bool),
    /// Only the row with this identity
    IdEquals(E::Id),
    /// The field's value contains `needle`
    Contains {
        /// Field to test
        field: Field<E>,
        /// Required substring
        needle: String,
        /// Ordinal comparison when true, case-folded otherwise
        case_sensitive: bool,
    },
    /// Any of the fields contains `needle`, ignoring case
    AnyContains {
        /// Fields combined with OR
        fields: Vec<Field<E>>,
        /// Required substring
        needle: String,
    },
    /// The row satisfies a specification
    Matches(Arc<dyn Specification<E>>),
}

impl<E: Entity> Criterion<E> {
    /// Whether `entity` satisfies this criterion
    pub fn matches(&self, entity: &E) -> bool {
        match self {
            Self::NotDeleted(is_deleted) => !is_deleted(entity),
            Self::IdEquals(id) => entity.id() == id,
            Self::Contains {
                field,
                needle,
                case_sensitive,
            } => field.value(entity).contains(needle, *case_sensitive),
            Self::AnyContains { fields, needle } => {
                fields.is_empty() || fields.iter().any(|f| f.value(entity).contains(needle, false))
            }
            Self::Matches(spec) => spec.is_satisfied_by(entity),
        }
    }
}

impl<E: Entity> Clone for Criterion<E> {
    fn clone(&self) -> Self {
        match self {
            Self::NotDeleted(f) => Self::NotDeleted(*f),
            Self::IdEquals(id) => Self::IdEquals(id.clone()),
            Self::Contains {
                field,
                needle,
                case_sensitive,
            } => Self::Contains {
                field: field.clone(),
                needle: needle.clone(),
                case_sensitive: *case_sensitive,
            },
            Self::AnyContains { fields, needle } => Self::AnyContains {
                fields: fields.clone(),
                needle: needle.clone(),
            },
            Self::Matches(spec) => Self::Matches(Arc::clone(spec)),
        }
    }
}

impl<E: Entity> fmt::Debug for Criterion<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDeleted(_) => write!(f, "NotDeleted"),
            Self::IdEquals(id) => write!(f, "IdEquals({:?})", id),
            Self::Contains {
                field,
                needle,
                case_sensitive,
            } => f
                .debug_struct("Contains")
                .field("field", &field.name())
                .field("needle", needle)
                .field("case_sensitive", case_sensitive)
                .finish(),
            Self::AnyContains { fields, needle } => f
                .debug_struct("AnyContains")
                .field("fields", &fields.iter().map(Field::name).collect::<Vec<_>>())
                .field("needle", needle)
                .finish(),
            Self::Matches(_) => write!(f, "Matches(..)"),
        }
    }
}

/// Row order of a query
///
/// Ties are always broken by ascending identity so paging is reproducible.
pub enum Order<E: Entity> {
    /// By identity
    ById(OrderDirection),
    /// By a named field
    ByField {
        /// Sort key
        field: Field<E>,
        /// Sort direction
        direction: OrderDirection,
    },
}

impl<E: Entity> Order<E> {
    /// Compare two rows
    pub fn compare(&self, a: &E, b: &E) -> Ordering {
        match self {
            Self::ById(direction) => directed(a.id().cmp(b.id()), *direction),
            Self::ByField { field, direction } => {
                directed(field.value(a).compare(&field.value(b)), *direction)
                    .then_with(|| a.id().cmp(b.id()))
            }
        }
    }
}

fn directed(ordering: Ordering, direction: OrderDirection) -> Ordering {
    match direction {
        OrderDirection::Ascending => ordering,
        OrderDirection::Descending => ordering.reverse(),
    }
}

impl<E: Entity> Default for Order<E> {
    fn default() -> Self {
        Self::ById(OrderDirection::Ascending)
    }
}

impl<E: Entity> Clone for Order<E> {
    fn clone(&self) -> Self {
        match self {
            Self::ById(direction) => Self::ById(*direction),
            Self::ByField { field, direction } => Self::ByField {
                field: field.clone(),
                direction: *direction,
            },
        }
    }
}

impl<E: Entity> fmt::Debug for Order<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ById(direction) => write!(f, "ById({})", direction),
            Self::ByField { field, direction } => {
                write!(f, "ByField({} {})", field.name(), direction)
            }
        }
    }
}

/// Criteria, order and paging for one store read
pub struct Query<E: Entity> {
    criteria: Vec<Criterion<E>>,
    order: Order<E>,
    pagination: Option<Pagination>,
}

impl<E: Entity> Default for Query<E> {
    fn default() -> Self {
        Self {
            criteria: Vec::new(),
            order: Order::default(),
            pagination: None,
        }
    }
}

impl<E: Entity> Query<E> {
    /// Every row, ascending by identity
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion; all criteria must hold
    #[must_use]
    pub fn filter(mut self, criterion: Criterion<E>) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Replace the order
    #[must_use]
    pub fn order_by(mut self, order: Order<E>) -> Self {
        self.order = order;
        self
    }

    /// Return only one slice of the ordered matches
    #[must_use]
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Return at most one row
    #[must_use]
    pub fn first(self) -> Self {
        self.paginate(Pagination::new(0, 1))
    }

    /// Criteria of this query
    pub fn criteria(&self) -> &[Criterion<E>] {
        &self.criteria
    }

    /// Order of this query
    pub fn order(&self) -> &Order<E> {
        &self.order
    }

    /// Paging of this query
    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    /// Whether `entity` satisfies every criterion
    pub fn matches(&self, entity: &E) -> bool {
        self.criteria.iter().all(|c| c.matches(entity))
    }

    /// Number of `rows` satisfying every criterion, ignoring paging
    pub fn count<'a>(&self, rows: impl IntoIterator<Item = &'a E>) -> u64 {
        rows.into_iter().filter(|e| self.matches(e)).count() as u64
    }

    /// Filter, order and page `rows`
    pub fn evaluate<'a>(&self, rows: impl IntoIterator<Item = &'a E>) -> Vec<E> {
        let mut matched: Vec<&E> = rows.into_iter().filter(|e| self.matches(e)).collect();
        matched.sort_by(|a, b| self.order.compare(a, b));

        let (offset, limit) = match self.pagination {
            Some(p) => (
                usize::try_from(p.offset).unwrap_or(usize::MAX),
                usize::try_from(p.limit).unwrap_or(usize::MAX),
            ),
            None => (0, usize::MAX),
        };

        matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }
}

impl<E: Entity> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            order: self.order.clone(),
            pagination: self.pagination,
        }
    }
}

impl<E: Entity> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("criteria", &self.criteria)
            .field("order", &self.order)
            .field("pagination", &self.pagination)
            .finish()
    }
}
