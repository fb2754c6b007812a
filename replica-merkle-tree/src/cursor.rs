//! Index arithmetic for a complete binary tree stored in a flat array.
//!
//! Positions are 1-based: root = 1, children of `p` are `2p` and `2p + 1`,
//! parent is `p / 2`. A tree with `n` leaves (a power of two) occupies
//! positions `1..2n`, leaf `i` sits at `n + i`, and index 0 is unused.
//!
//! ```text
//!              1
//!          /       \
//!        2           3
//!      /   \       /   \
//!     4     5     6     7
//!    / \   / \   / \   / \
//!   8   9 10 11 12 13 14 15
//! ```

use std::ops::{Index, IndexMut};

use crate::{Error, Result};

/// Returns `true` if `n` is a positive power of two.
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && n & (n - 1) == 0
}

/// A position in an [`ArrayTree`].
///
/// No bounds checks: callers keep positions within `[1, 2 * leaf_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor(usize);

impl Cursor {
    /// The root position.
    pub const ROOT: Cursor = Cursor(1);

    /// Wrap a raw 1-based position.
    pub const fn new(position: usize) -> Self {
        Cursor(position)
    }

    /// Position of leaf `n` in a tree of `out_of` leaves.
    pub const fn leaf(n: usize, out_of: usize) -> Self {
        Cursor(out_of + n)
    }

    /// The raw 1-based position.
    pub const fn position(self) -> usize {
        self.0
    }

    pub const fn parent(self) -> Self {
        Cursor(self.0 / 2)
    }

    pub const fn left_child(self) -> Self {
        Cursor(self.0 * 2)
    }

    pub const fn right_child(self) -> Self {
        Cursor(self.0 * 2 + 1)
    }

    /// The other child of this node's parent.
    pub const fn sibling(self) -> Self {
        Cursor(self.0 ^ 1)
    }

    pub const fn is_root(self) -> bool {
        self.0 == 1
    }

    /// Left children have even positions. The root is not a left child.
    pub const fn is_left_child(self) -> bool {
        self.0 & 1 == 0
    }

    /// `false` for the leftmost node of each layer.
    pub fn has_left(self) -> bool {
        !is_power_of_two(self.0)
    }

    /// `false` for the rightmost node of each layer.
    pub fn has_right(self) -> bool {
        !is_power_of_two(self.0 + 1)
    }

    /// The neighbour to the left on the same layer. Requires `has_left`.
    pub const fn left(self) -> Self {
        Cursor(self.0 - 1)
    }

    /// The neighbour to the right on the same layer. Requires `has_right`.
    pub const fn right(self) -> Self {
        Cursor(self.0 + 1)
    }

    /// Number of steps up to the root.
    pub const fn depth(self) -> u32 {
        usize::BITS - 1 - self.0.leading_zeros()
    }
}

/// A complete binary tree of `T` stored in a flat array, addressed by
/// [`Cursor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayTree<T> {
    store: Box<[T]>,
}

impl<T> ArrayTree<T> {
    /// Take ownership of a flat store. Its length must be a power of two of
    /// at least 2; index 0 is never addressed.
    pub fn from_store(store: Vec<T>) -> Result<Self> {
        if store.len() < 2 {
            return Err(Error::InvalidConfiguration(
                "array tree can't be empty".to_string(),
            ));
        }
        if !is_power_of_two(store.len()) {
            return Err(Error::InvalidConfiguration(format!(
                "array tree must be a full binary tree, got {} slots",
                store.len()
            )));
        }
        Ok(Self {
            store: store.into_boxed_slice(),
        })
    }

    /// A tree with `leaf_count` leaves, every slot produced by `fill`.
    pub fn with_leaves(leaf_count: usize, fill: impl FnMut() -> T) -> Result<Self> {
        let len = leaf_count.checked_mul(2).ok_or_else(|| {
            Error::InvalidConfiguration(format!("{} leaves is too many", leaf_count))
        })?;
        let mut store = Vec::with_capacity(len);
        store.resize_with(len, fill);
        Self::from_store(store)
    }

    /// Length of the flat store, twice the number of leaves.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Always `false`; an array tree has at least one leaf.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn leaf_count(&self) -> usize {
        self.store.len() / 2
    }

    pub fn root(&self) -> Cursor {
        Cursor::ROOT
    }

    /// Cursor of leaf `n`.
    pub fn leaf(&self, n: usize) -> Cursor {
        Cursor::leaf(n, self.leaf_count())
    }

    /// Cursor of the last leaf.
    pub fn last_leaf(&self) -> Cursor {
        Cursor::new(self.store.len() - 1)
    }

    /// Values layer by layer, top to bottom, left to right.
    pub fn layers_top_down(&self) -> impl Iterator<Item = &T> + '_ {
        self.store.iter().skip(1)
    }
}

impl<T> Index<Cursor> for ArrayTree<T> {
    type Output = T;

    fn index(&self, cursor: Cursor) -> &T {
        &self.store[cursor.0]
    }
}

impl<T> IndexMut<Cursor> for ArrayTree<T> {
    fn index_mut(&mut self, cursor: Cursor) -> &mut T {
        &mut self.store[cursor.0]
    }
}
