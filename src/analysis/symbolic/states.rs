//! A small collection of successor states.
//!
//! Most operations produce exactly one successor state, branch learning produces two, and
//! only a few known methods produce more. [`States`] stores up to two elements inline so the
//! common cases never allocate.

use std::{iter::FromIterator, ops::Add, vec};

/// Zero or more values, with the first two stored inline.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum States<T> {
    /// No value; the path ends
    Empty,
    /// Exactly one value
    One(T),
    /// Exactly two values
    Two(T, T),
    /// Three or more values
    Many(Vec<T>),
}

impl<T> Default for States<T> {
    fn default() -> Self {
        States::Empty
    }
}

impl<T> States<T> {
    /// Returns an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        States::Empty
    }

    /// Appends a value.
    pub fn push(&mut self, value: T) {
        *self = match std::mem::take(self) {
            States::Empty => States::One(value),
            States::One(first) => States::Two(first, value),
            States::Two(first, second) => States::Many(vec![first, second, value]),
            States::Many(mut values) => {
                values.push(value);
                States::Many(values)
            }
        };
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            States::Empty => 0,
            States::One(_) => 1,
            States::Two(_, _) => 2,
            States::Many(values) => values.len(),
        }
    }

    /// Returns `true` if there is no value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the values in insertion order.
    pub fn iter(&self) -> Iter<'_, T> {
        let (first, second, rest): (Option<&T>, Option<&T>, &[T]) = match self {
            States::Empty => (None, None, &[]),
            States::One(first) => (Some(first), None, &[]),
            States::Two(first, second) => (Some(first), Some(second), &[]),
            States::Many(values) => (None, None, values.as_slice()),
        };
        Iter {
            first,
            second,
            rest: rest.iter(),
        }
    }

    /// Applies `f` to every value.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> States<U> {
        match self {
            States::Empty => States::Empty,
            States::One(first) => States::One(f(first)),
            States::Two(first, second) => {
                let first = f(first);
                States::Two(first, f(second))
            }
            States::Many(values) => States::Many(values.into_iter().map(f).collect()),
        }
    }
}

impl<T> From<T> for States<T> {
    fn from(value: T) -> Self {
        States::One(value)
    }
}

impl<T> Add for States<T> {
    type Output = States<T>;

    fn add(mut self, rhs: Self) -> Self::Output {
        for value in rhs {
            self.push(value);
        }
        self
    }
}

impl<T> FromIterator<T> for States<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut states = States::Empty;
        for value in iter {
            states.push(value);
        }
        states
    }
}

impl<T> Extend<T> for States<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

/// Owning iterator over [`States`].
pub struct IntoIter<T> {
    first: Option<T>,
    second: Option<T>,
    rest: vec::IntoIter<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.first
            .take()
            .or_else(|| self.second.take())
            .or_else(|| self.rest.next())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = usize::from(self.first.is_some()) + usize::from(self.second.is_some()) + self.rest.len();
        (len, Some(len))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> IntoIterator for States<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        let (first, second, rest) = match self {
            States::Empty => (None, None, Vec::new()),
            States::One(first) => (Some(first), None, Vec::new()),
            States::Two(first, second) => (Some(first), Some(second), Vec::new()),
            States::Many(values) => (None, None, values),
        };
        IntoIter {
            first,
            second,
            rest: rest.into_iter(),
        }
    }
}

/// Borrowing iterator over [`States`].
pub struct Iter<'a, T> {
    first: Option<&'a T>,
    second: Option<&'a T>,
    rest: std::slice::Iter<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.first
            .take()
            .or_else(|| self.second.take())
            .or_else(|| self.rest.next())
    }
}

impl<'a, T> IntoIterator for &'a States<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_grows_through_variants() {
        let mut states = States::new();
        assert!(states.is_empty());
        states.push(1);
        assert_eq!(states, States::One(1));
        states.push(2);
        assert_eq!(states, States::Two(1, 2));
        states.push(3);
        assert_eq!(states, States::Many(vec![1, 2, 3]));
        assert_eq!(states.len(), 3);
    }

    #[test]
    fn test_add_and_iterate_preserve_order() {
        let left: States<i32> = [1, 2].into_iter().collect();
        let right: States<i32> = States::One(3) + States::Empty + States::One(4);
        let all = left + right;
        assert_eq!(all.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(all.into_iter().len(), 4);
    }

    #[test]
    fn test_map_keeps_shape() {
        let doubled = States::Two(1, 2).map(|v| v * 2);
        assert_eq!(doubled, States::Two(2, 4));
    }
}
