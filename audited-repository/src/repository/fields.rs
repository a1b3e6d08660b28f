//! Named, typed field accessors for dynamic filtering and sorting
//!
//! Callers address entity fields by name in [`PagedRequest`] filters and
//! `order_by`. Each entity type declares the fields it exposes through
//! [`Queryable::fields`]; the declaration is validated once, when a
//! repository is bound, and later lookups are case-insensitive.
//!
//! [`PagedRequest`]: super::PagedRequest
//!
//! # Example
//!
//! ```rust
//! use audited_repository::domain::{DomainEvents, Entity};
//! use audited_repository::repository::{FieldRegistryBuilder, FieldValue, Queryable};
//!
//! #[derive(Debug, Clone)]
//! struct Product {
//!     id: u32,
//!     name: String,
//!     stock: i64,
//!     events: DomainEvents,
//! }
//!
//! impl Entity for Product {
//!     type Id = u32;
//!     fn id(&self) -> &u32 { &self.id }
//!     fn events(&self) -> &DomainEvents { &self.events }
//!     fn events_mut(&mut self) -> &mut DomainEvents { &mut self.events }
//! }
//!
//! impl Queryable for Product {
//!     fn fields() -> FieldRegistryBuilder<Self> {
//!         FieldRegistryBuilder::new()
//!             .text("name", |p: &Product| p.name.as_str())
//!             .integer("stock", |p: &Product| p.stock)
//!     }
//! }
//!
//! let registry = Product::fields().build().unwrap();
//! let field = registry.resolve("NAME").unwrap();
//! let widget = Product { id: 1, name: "Widget".into(), stock: 3, events: DomainEvents::new() };
//! assert_eq!(field.value(&widget), FieldValue::Text("Widget".into()));
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::domain::{entity_name, Entity};

use super::error::{RepositoryError, RepositoryOperation};
use super::traits::RepositoryResult;

/// Valid field names: an identifier
static FIELD_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("field name regex is valid")
});

/// An entity type whose fields can be filtered, searched and sorted by name
pub trait Queryable: Entity {
    /// Declare the fields exposed to dynamic queries
    fn fields() -> FieldRegistryBuilder<Self>;
}

/// Value read from an entity field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent optional value
    Null,
    /// Text value
    Text(String),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// Point in time
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// The text, when this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether the rendered value contains `needle`
    ///
    /// Non-text values are matched against their display form. `Null` never
    /// matches.
    pub fn contains(&self, needle: &str, case_sensitive: bool) -> bool {
        let haystack = match self {
            Self::Null => return false,
            Self::Text(text) => std::borrow::Cow::Borrowed(text.as_str()),
            other => std::borrow::Cow::Owned(other.to_string()),
        };
        if case_sensitive {
            haystack.contains(needle)
        } else {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }
    }

    /// Total order used for sorting
    ///
    /// `Null` sorts first. Values of different kinds, which a single field
    /// never produces, order by kind.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) => 2,
            Self::Float(_) => 3,
            Self::Timestamp(_) => 4,
            Self::Text(_) => 5,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Timestamp(at) => write!(f, "{}", at.to_rfc3339()),
        }
    }
}

/// Kind of value a field produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Required or optional text; participates in search
    Text,
    /// Integer
    Integer,
    /// Floating point
    Float,
    /// Boolean
    Boolean,
    /// Point in time
    Timestamp,
}

type Accessor<E> = Arc<dyn Fn(&E) -> FieldValue + Send + Sync>;

/// One named field of an entity type
pub struct Field<E> {
    name: String,
    kind: FieldKind,
    accessor: Accessor<E>,
}

impl<E> Field<E> {
    /// Declared name, with its original casing
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of value this field produces
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Read this field from `entity`
    pub fn value(&self, entity: &E) -> FieldValue {
        (self.accessor)(entity)
    }
}

impl<E> Clone for Field<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            accessor: Arc::clone(&self.accessor),
        }
    }
}

impl<E> fmt::Debug for Field<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Declaration of an entity type's queryable fields
pub struct FieldRegistryBuilder<E> {
    fields: Vec<Field<E>>,
}

impl<E> Default for FieldRegistryBuilder<E> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<E: Entity> FieldRegistryBuilder<E> {
    /// Start an empty declaration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        mut self,
        name: &str,
        kind: FieldKind,
        accessor: impl Fn(&E) -> FieldValue + Send + Sync + 'static,
    ) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            kind,
            accessor: Arc::new(accessor),
        });
        self
    }

    /// Declare a required text field
    #[must_use]
    pub fn text<F>(self, name: &str, get: F) -> Self
    where
        F: Fn(&E) -> &str + Send + Sync + 'static,
    {
        self.push(name, FieldKind::Text, move |e| {
            FieldValue::Text(get(e).to_string())
        })
    }

    /// Declare an optional text field
    #[must_use]
    pub fn optional_text<F>(self, name: &str, get: F) -> Self
    where
        F: Fn(&E) -> Option<&str> + Send + Sync + 'static,
    {
        self.push(name, FieldKind::Text, move |e| {
            get(e).map_or(FieldValue::Null, |s| FieldValue::Text(s.to_string()))
        })
    }

    /// Declare an integer field
    #[must_use]
    pub fn integer<F>(self, name: &str, get: F) -> Self
    where
        F: Fn(&E) -> i64 + Send + Sync + 'static,
    {
        self.push(name, FieldKind::Integer, move |e| FieldValue::Integer(get(e)))
    }

    /// Declare a floating point field
    #[must_use]
    pub fn float<F>(self, name: &str, get: F) -> Self
    where
        F: Fn(&E) -> f64 + Send + Sync + 'static,
    {
        self.push(name, FieldKind::Float, move |e| FieldValue::Float(get(e)))
    }

    /// Declare a boolean field
    #[must_use]
    pub fn boolean<F>(self, name: &str, get: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.push(name, FieldKind::Boolean, move |e| FieldValue::Boolean(get(e)))
    }

    /// Declare an optional timestamp field
    #[must_use]
    pub fn timestamp<F>(self, name: &str, get: F) -> Self
    where
        F: Fn(&E) -> Option<DateTime<Utc>> + Send + Sync + 'static,
    {
        self.push(name, FieldKind::Timestamp, move |e| {
            get(e).map_or(FieldValue::Null, FieldValue::Timestamp)
        })
    }

    /// Validate names and index the fields
    ///
    /// Fails with `InvalidField` when a name is not an identifier or two
    /// names differ only by case.
    pub fn build(self) -> RepositoryResult<FieldRegistry<E>> {
        let mut index = HashMap::with_capacity(self.fields.len());
        for (position, field) in self.fields.iter().enumerate() {
            if !FIELD_NAME_REGEX.is_match(&field.name) {
                return Err(RepositoryError::invalid_field(
                    RepositoryOperation::Bind,
                    entity_name::<E>(),
                    &field.name,
                ));
            }
            if index.insert(field.name.to_lowercase(), position).is_some() {
                return Err(RepositoryError {
                    message: format!("Duplicate field '{}'", field.name),
                    ..RepositoryError::invalid_field(
                        RepositoryOperation::Bind,
                        entity_name::<E>(),
                        &field.name,
                    )
                });
            }
        }
        Ok(FieldRegistry {
            fields: self.fields,
            index,
        })
    }
}

/// Validated, case-insensitive index of an entity type's fields
pub struct FieldRegistry<E> {
    fields: Vec<Field<E>>,
    index: HashMap<String, usize>,
}

impl<E> FieldRegistry<E> {
    /// Field with the given name, ignoring case
    pub fn get(&self, name: &str) -> Option<&Field<E>> {
        self.index
            .get(&name.to_lowercase())
            .map(|&position| &self.fields[position])
    }

    /// Field with the given name, or an `InvalidField` error for `operation`
    pub fn resolve_for(
        &self,
        operation: RepositoryOperation,
        name: &str,
    ) -> RepositoryResult<&Field<E>> {
        self.get(name).ok_or_else(|| {
            RepositoryError::invalid_field(operation, entity_name::<E>(), name)
        })
    }

    /// Field with the given name, or an `InvalidField` error
    pub fn resolve(&self, name: &str) -> RepositoryResult<&Field<E>> {
        self.resolve_for(RepositoryOperation::GetPaged, name)
    }

    /// Fields that participate in search
    pub fn text_fields(&self) -> impl Iterator<Item = &Field<E>> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Text)
    }

    /// Every declared field, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Field<E>> {
        self.fields.iter()
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<E> fmt::Debug for FieldRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fields.iter()).finish()
    }
}
