//! Write-once storage cells.
//!
//! A slot starts empty and is filled at most once with a single
//! compare-and-set. Racing writers of the same value all succeed; the
//! losers' values are dropped. A writer bringing a different value means
//! two verified proofs disagree about a node, which can only happen with a
//! broken hash function or a bug in the tree, so it panics.

use std::fmt;

use once_cell::race::OnceBox;

/// Outcome of [`WriteOnce::fill`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fill {
    /// This call stored the value.
    Written,
    /// An equal value was already there.
    Present,
}

pub(crate) struct WriteOnce<T>(OnceBox<T>);

impl<T> Default for WriteOnce<T> {
    fn default() -> Self {
        Self(OnceBox::new())
    }
}

impl<T> WriteOnce<T> {
    pub(crate) fn get(&self) -> Option<&T> {
        self.0.get()
    }

    pub(crate) fn is_filled(&self) -> bool {
        self.0.get().is_some()
    }
}

impl<T: PartialEq + fmt::Debug> WriteOnce<T> {
    /// Store `value` unless the slot is already filled.
    ///
    /// Panics if the slot holds a different value.
    pub(crate) fn fill(&self, value: T) -> Fill {
        let rejected = match self.0.set(Box::new(value)) {
            Ok(()) => return Fill::Written,
            Err(rejected) => rejected,
        };
        match self.0.get() {
            Some(current) if *current == *rejected => Fill::Present,
            Some(current) => panic!(
                "internal invariant violation: write-once slot holds {:?}, refusing {:?}",
                current, rejected
            ),
            None => unreachable!("OnceBox::set failed on an empty cell"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for WriteOnce<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Filled").field(value).finish(),
            None => f.write_str("Empty"),
        }
    }
}
