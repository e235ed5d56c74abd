//! A sequence with at least one element

use serde::{Serialize, Serializer};

/// An ordered sequence that always holds at least one element.
///
/// A successful wait returns this instead of a `Vec`, so callers never
/// have to re-check for an empty result.
///
/// # Examples
///
/// ```
/// use zeta_inbox::NonEmpty;
///
/// assert!(NonEmpty::<u32>::from_vec(vec![]).is_none());
///
/// let xs = NonEmpty::from_vec(vec![1, 2, 3]).unwrap();
/// assert_eq!(*xs.first(), 1);
/// assert_eq!(xs.map(|x| x * 10).into_vec(), vec![10, 20, 30]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmpty<T> {
    head: T,
    tail: Vec<T>,
}

impl<T> NonEmpty<T> {
    #[must_use]
    pub const fn new(head: T) -> Self {
        Self {
            head,
            tail: Vec::new(),
        }
    }

    /// `None` if `items` is empty.
    #[must_use]
    pub fn from_vec(mut items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        let tail = items.split_off(1);
        items.pop().map(|head| Self { head, tail })
    }

    pub fn push(&mut self, item: T) {
        self.tail.push(item);
    }

    #[must_use]
    pub const fn first(&self) -> &T {
        &self.head
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tail.len() + 1
    }

    /// Always `false`; present for API symmetry with slices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        std::iter::once(&self.head).chain(self.tail.iter())
    }

    #[must_use]
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> NonEmpty<U> {
        NonEmpty {
            head: f(self.head),
            tail: self.tail.into_iter().map(f).collect(),
        }
    }

    /// Map every element, stopping at the first error.
    ///
    /// # Errors
    ///
    /// The first error returned by `f`.
    pub fn try_map<U, E>(&self, mut f: impl FnMut(&T) -> Result<U, E>) -> Result<NonEmpty<U>, E> {
        Ok(NonEmpty {
            head: f(&self.head)?,
            tail: self.tail.iter().map(f).collect::<Result<_, _>>()?,
        })
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        let mut v = Vec::with_capacity(self.len());
        v.push(self.head);
        v.extend(self.tail);
        v
    }
}

impl<T> IntoIterator for NonEmpty<T> {
    type Item = T;
    type IntoIter = std::iter::Chain<std::iter::Once<T>, std::vec::IntoIter<T>>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self.head).chain(self.tail)
    }
}

impl<'a, T> IntoIterator for &'a NonEmpty<T> {
    type Item = &'a T;
    type IntoIter = std::iter::Chain<std::iter::Once<&'a T>, std::slice::Iter<'a, T>>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(&self.head).chain(self.tail.iter())
    }
}

impl<T: Serialize> Serialize for NonEmpty<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
