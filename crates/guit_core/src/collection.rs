//! Ordered collection bound to a single element type.
//!
//! Used for a node's children (strong handles) and for its ancestry path (weak handles).

use std::any::{Any, type_name};
use std::fmt;
use std::slice;
use std::sync::{Arc, Weak};

use thiserror::Error;

/// Errors raised by [`Collection`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error("type mismatch: collection holds `{expected}`, got `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Identity comparison for handle types.
///
/// Removal from a [`Collection`] is by identity, never by value: two distinct nodes with the same
/// title are different members.
pub trait Identity {
    fn same_as(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Identity for Arc<T> {
    fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Identity for Weak<T> {
    fn same_as(&self, other: &Self) -> bool {
        Weak::ptr_eq(self, other)
    }
}

/// Insertion-ordered sequence of `T`.
///
/// `Clone` is shallow: the clone holds the same handles in the same order, in its own storage, so
/// appending to or removing from the clone never touches the original.
#[derive(Clone)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: 'static> Collection<T> {
    /// Create an empty collection bound to `T`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the bound element type.
    pub fn item_type(&self) -> &'static str {
        type_name::<T>()
    }

    /// Append an item.
    pub fn add_item(&mut self, item: T) {
        self.items.push(item);
    }

    /// Append a dynamically typed value.
    ///
    /// ## Errors
    ///
    /// Returns [`CollectionError::TypeMismatch`] when `value` is not a `T`. The collection is left
    /// untouched in that case.
    pub fn add_any<V: Any>(&mut self, value: V) -> Result<(), CollectionError> {
        let boxed: Box<dyn Any> = Box::new(value);
        match boxed.downcast::<T>() {
            Ok(item) => {
                self.items.push(*item);
                Ok(())
            }
            Err(_) => Err(CollectionError::TypeMismatch {
                expected: type_name::<T>(),
                found: type_name::<V>(),
            }),
        }
    }

    /// Element at `index`, or `None` when out of range.
    pub fn get_item(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Identity + 'static> Collection<T> {
    /// Remove the first element identical to `item`.
    ///
    /// Returns `false` (and does nothing) when `item` is not a member.
    pub fn remove_item(&mut self, item: &T) -> bool {
        match self.items.iter().position(|candidate| candidate.same_as(item)) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether `item` is a member (by identity).
    pub fn contains(&self, item: &T) -> bool {
        self.items.iter().any(|candidate| candidate.same_as(item))
    }
}

impl<T: 'static> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a, T: 'static> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}
