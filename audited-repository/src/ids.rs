//! Type-safe entity identifiers using the TypeID specification
//!
//! Entities choose their own identity type. [`EntityId`] is a ready-made
//! choice: a prefix-typed, UUIDv7-backed TypeID that sorts by creation time,
//! so ascending identity order doubles as insertion order.
//!
//! ```rust
//! use audited_repository::ids::{EntityId, IdPrefix};
//!
//! #[derive(Debug)]
//! struct Customer;
//!
//! impl IdPrefix for Customer {
//!     const PREFIX: &'static str = "cust";
//! }
//!
//! type CustomerId = EntityId<Customer>;
//!
//! let id = CustomerId::new();
//! assert!(id.as_str().starts_with("cust_"));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use mti::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Prefix that marks an identifier as belonging to one entity type
pub trait IdPrefix: Send + Sync + 'static {
    /// TypeID prefix, lowercase ASCII letters and underscores
    const PREFIX: &'static str;
}

/// A prefix-typed, time-sortable entity identifier
///
/// # Format
///
/// `<prefix>_<base32-encoded-uuidv7>`, for example
/// `cust_01h455vb4pex5vsknk084sn02q`.
pub struct EntityId<P> {
    inner: MagicTypeId,
    _prefix: PhantomData<fn() -> P>,
}

impl<P: IdPrefix> EntityId<P> {
    /// Creates a new identifier with a UUIDv7 (time-sortable).
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: P::PREFIX.create_type_id::<V7>(),
            _prefix: PhantomData,
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    /// Returns the prefix portion of the identifier.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.inner.prefix().as_str()
    }

    /// Returns the underlying `MagicTypeId`.
    #[must_use]
    pub fn inner(&self) -> &MagicTypeId {
        &self.inner
    }
}

impl<P: IdPrefix> Default for EntityId<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for EntityId<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _prefix: PhantomData,
        }
    }
}

impl<P> PartialEq for EntityId<P> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<P> Eq for EntityId<P> {}

impl<P> PartialOrd for EntityId<P> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for EntityId<P> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner.cmp(&other.inner)
    }
}

impl<P> Hash for EntityId<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<P> fmt::Debug for EntityId<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityId").field(&self.inner.as_str()).finish()
    }
}

impl<P> fmt::Display for EntityId<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl<P: IdPrefix> FromStr for EntityId<P> {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = MagicTypeId::from_str(s).map_err(EntityIdError::Parse)?;

        if inner.prefix().as_str() != P::PREFIX {
            return Err(EntityIdError::InvalidPrefix {
                expected: P::PREFIX.to_string(),
                actual: inner.prefix().as_str().to_string(),
            });
        }

        Ok(Self {
            inner,
            _prefix: PhantomData,
        })
    }
}

impl<P> AsRef<str> for EntityId<P> {
    fn as_ref(&self) -> &str {
        self.inner.as_str()
    }
}

impl<P> From<EntityId<P>> for String {
    fn from(id: EntityId<P>) -> Self {
        id.inner.to_string()
    }
}

impl<P> Serialize for EntityId<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.inner.as_str())
    }
}

impl<'de, P: IdPrefix> Deserialize<'de> for EntityId<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for entity identifier parsing.
#[derive(Debug, thiserror::Error)]
pub enum EntityIdError {
    /// The ID could not be parsed as a valid TypeID.
    #[error("failed to parse entity ID: {0}")]
    Parse(#[from] MagicTypeIdError),

    /// The prefix was not the expected value.
    #[error("invalid prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        /// The expected prefix.
        expected: String,
        /// The actual prefix found.
        actual: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Order;

    impl IdPrefix for Order {
        const PREFIX: &'static str = "order";
    }

    type OrderId = EntityId<Order>;

    #[test]
    fn test_entity_id_new() {
        let id = OrderId::new();
        assert!(id.as_str().starts_with("order_"));
        assert_eq!(id.prefix(), "order");
        // prefix (5) + underscore (1) + suffix (26)
        assert_eq!(id.as_str().len(), 32);
    }

    #[test]
    fn test_entity_id_parse() {
        let raw = "order_01h455vb4pex5vsknk084sn02q";
        let id = OrderId::from_str(raw).unwrap();
        assert_eq!(id.as_str(), raw);
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn test_entity_id_invalid_prefix() {
        let result = OrderId::from_str("user_01h455vb4pex5vsknk084sn02q");

        match result.unwrap_err() {
            EntityIdError::InvalidPrefix { expected, actual } => {
                assert_eq!(expected, "order");
                assert_eq!(actual, "user");
            }
            other => panic!("Expected InvalidPrefix error, got {other:?}"),
        }
    }

    #[test]
    fn test_entity_id_invalid_format() {
        assert!(matches!(
            OrderId::from_str("order_invalid"),
            Err(EntityIdError::Parse(_))
        ));
    }

    #[test]
    fn test_entity_ids_sort_by_creation_time() {
        let first = OrderId::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let second = OrderId::new();

        assert!(first < second);
    }

    #[test]
    fn test_entity_id_serde_as_string() {
        let id = OrderId::from_str("order_01h455vb4pex5vsknk084sn02q").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"order_01h455vb4pex5vsknk084sn02q\"");

        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let wrong: Result<OrderId, _> = serde_json::from_str("\"user_01h455vb4pex5vsknk084sn02q\"");
        assert!(wrong.is_err());
    }
}
