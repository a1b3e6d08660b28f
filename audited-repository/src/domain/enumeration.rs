//! Closed-set value types
//!
//! An [`Enumeration`] is a type with a fixed list of named instances, each
//! carrying a numeric id. Instances are looked up by id or by
//! case-insensitive name through a registry built once, on first use, from
//! the type's declared instance list.
//!
//! Declare one with the [`enumeration!`](crate::enumeration) macro:
//!
//! ```rust
//! use audited_repository::domain::Enumeration;
//! use audited_repository::enumeration;
//!
//! enumeration! {
//!     /// Payment lifecycle
//!     pub enum PaymentStatus {
//!         Pending = 1 => "Pending",
//!         Settled = 2 => "Settled",
//!         Refunded = 3 => "Refunded",
//!     }
//! }
//!
//! assert_eq!(PaymentStatus::from_value(2).unwrap(), PaymentStatus::Settled);
//! assert_eq!(PaymentStatus::from_name("refunded").unwrap(), PaymentStatus::Refunded);
//! assert!(PaymentStatus::Pending < PaymentStatus::Settled);
//! assert_eq!(PaymentStatus::Settled.to_string(), "Settled");
//! ```

use std::collections::HashMap;

use super::entity::entity_name;
use super::error::{DomainError, LookupKey};

/// Closed-set value type with id and name lookup
pub trait Enumeration: Copy + Eq + Ord + Send + Sync + 'static {
    /// Every declared instance, in declaration order
    const ALL: &'static [Self];

    /// Numeric id of this instance
    fn id(&self) -> i32;

    /// Display name of this instance
    fn name(&self) -> &'static str;

    /// Registry built from [`ALL`](Self::ALL) on first use
    fn registry() -> &'static EnumerationRegistry<Self>;

    /// Every declared instance
    fn all() -> &'static [Self] {
        Self::ALL
    }

    /// Instance with the given id
    fn from_value(id: i32) -> Result<Self, DomainError> {
        Self::registry()
            .by_id(id)
            .ok_or_else(|| DomainError::NotFound {
                type_name: entity_name::<Self>(),
                lookup: LookupKey::Value,
                key: id.to_string(),
            })
    }

    /// Instance whose name matches, ignoring case
    fn from_name(name: &str) -> Result<Self, DomainError> {
        Self::registry()
            .by_name(name)
            .ok_or_else(|| DomainError::NotFound {
                type_name: entity_name::<Self>(),
                lookup: LookupKey::Name,
                key: name.to_string(),
            })
    }
}

/// Id and name index over one enumeration type's instances
#[derive(Debug)]
pub struct EnumerationRegistry<T> {
    by_id: HashMap<i32, T>,
    by_name: HashMap<String, T>,
}

impl<T: Enumeration> EnumerationRegistry<T> {
    /// Index `items`
    ///
    /// [`enumeration!`] rejects duplicate ids and names at compile time. For
    /// hand-written impls the first instance wins when two share an id or a
    /// case-insensitive name, and the duplicate is logged and ignored.
    ///
    /// [`enumeration!`]: crate::enumeration
    pub fn build(items: &[T]) -> Self {
        let mut by_id = HashMap::with_capacity(items.len());
        let mut by_name = HashMap::with_capacity(items.len());

        for item in items {
            if by_id.contains_key(&item.id()) {
                tracing::warn!(
                    enumeration = entity_name::<T>(),
                    id = item.id(),
                    "Duplicate enumeration id ignored"
                );
                continue;
            }
            let key = item.name().to_lowercase();
            if by_name.contains_key(&key) {
                tracing::warn!(
                    enumeration = entity_name::<T>(),
                    name = item.name(),
                    "Duplicate enumeration name ignored"
                );
                continue;
            }
            by_id.insert(item.id(), *item);
            by_name.insert(key, *item);
        }

        Self { by_id, by_name }
    }

    /// Instance with the given id
    pub fn by_id(&self, id: i32) -> Option<T> {
        self.by_id.get(&id).copied()
    }

    /// Instance whose name matches, ignoring case
    pub fn by_name(&self, name: &str) -> Option<T> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// Number of indexed instances
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether no instance is indexed
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Whether every id in `ids` is distinct
#[doc(hidden)]
pub const fn ids_are_unique(ids: &[i32]) -> bool {
    let mut i = 0;
    while i < ids.len() {
        let mut j = i + 1;
        while j < ids.len() {
            if ids[i] == ids[j] {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

/// Whether every name in `names` is distinct, ignoring ASCII case
#[doc(hidden)]
pub const fn names_are_unique(names: &[&str]) -> bool {
    let mut i = 0;
    while i < names.len() {
        let mut j = i + 1;
        while j < names.len() {
            if eq_ignore_ascii_case(names[i].as_bytes(), names[j].as_bytes()) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const fn eq_ignore_ascii_case(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut k = 0;
    while k < a.len() {
        if a[k].to_ascii_lowercase() != b[k].to_ascii_lowercase() {
            return false;
        }
        k += 1;
    }
    true
}

/// Declare a closed-set enumeration
///
/// Generates a fieldless enum, an [`Enumeration`] impl with a static
/// registry, ordering by id and `Display` by name. Ids and names must be
/// unique, so equality and ordering agree and every instance is reachable
/// by name. A duplicate fails to compile:
///
/// ```rust,compile_fail
/// audited_repository::enumeration! {
///     enum Tier {
///         Gold = 1 => "Gold",
///         Silver = 1 => "Silver",
///     }
/// }
/// ```
///
/// ```rust,compile_fail
/// audited_repository::enumeration! {
///     enum Tier {
///         Gold = 1 => "Gold",
///         Platinum = 2 => "GOLD",
///     }
/// }
/// ```
#[macro_export]
macro_rules! enumeration {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $id:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        const _: () = {
            assert!(
                $crate::domain::ids_are_unique(&[ $( $id ),+ ]),
                concat!("duplicate id in enumeration ", stringify!($name))
            );
            assert!(
                $crate::domain::names_are_unique(&[ $( $label ),+ ]),
                concat!("duplicate name in enumeration ", stringify!($name))
            );
        };

        impl $crate::domain::Enumeration for $name {
            const ALL: &'static [Self] = &[ $( Self::$variant ),+ ];

            fn id(&self) -> i32 {
                match self {
                    $( Self::$variant => $id ),+
                }
            }

            fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant => $label ),+
                }
            }

            fn registry() -> &'static $crate::domain::EnumerationRegistry<Self> {
                static REGISTRY: ::std::sync::LazyLock<$crate::domain::EnumerationRegistry<$name>> =
                    ::std::sync::LazyLock::new(|| {
                        $crate::domain::EnumerationRegistry::build(
                            <$name as $crate::domain::Enumeration>::ALL,
                        )
                    });
                &REGISTRY
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<::std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> ::std::cmp::Ordering {
                $crate::domain::Enumeration::id(self).cmp(&$crate::domain::Enumeration::id(other))
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::domain::Enumeration::name(self))
            }
        }
    };
}
