//! Per-commitment-tree containers
//!
//! Proof data is shaped tree / column / item. `TreeVec<T>` is an ordered
//! sequence indexed by commitment-tree index; tree 0 is conventionally the
//! preprocessed tree.

use core::ops::{Deref, DerefMut};

/// Errors from shape-sensitive `TreeVec` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeVecError {
    /// Two tree vectors disagree on their tree count.
    ShapeMismatch,
    /// The same tree index was supplied twice.
    DuplicateTreeIndex,
    /// A sub-tree span does not fit the tree count.
    InvalidSubTreeSpan,
}

impl core::fmt::Display for TreeVecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ShapeMismatch => write!(f, "tree vectors have mismatching shapes"),
            Self::DuplicateTreeIndex => write!(f, "duplicate tree index"),
            Self::InvalidSubTreeSpan => write!(f, "invalid sub-tree span"),
        }
    }
}

impl std::error::Error for TreeVecError {}

/// An ordered sequence of `T`, one per commitment tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeVec<T>(pub Vec<T>);

impl<T> TreeVec<T> {
    pub fn new(vec: Vec<T>) -> Self {
        Self(vec)
    }

    /// Builds from `(tree_index, value)` pairs; every index in
    /// `[0, pairs.len())` must appear exactly once.
    pub fn from_indexed(pairs: Vec<(usize, T)>) -> Result<Self, TreeVecError> {
        let n = pairs.len();
        let mut slots: Vec<Option<T>> = (0..n).map(|_| None).collect();
        for (index, value) in pairs {
            if index >= n {
                return Err(TreeVecError::InvalidSubTreeSpan);
            }
            if slots[index].is_some() {
                return Err(TreeVecError::DuplicateTreeIndex);
            }
            slots[index] = Some(value);
        }
        Ok(Self(slots.into_iter().map(|slot| slot.unwrap()).collect()))
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> TreeVec<U> {
        TreeVec(self.0.into_iter().map(f).collect())
    }

    pub fn as_ref(&self) -> TreeVec<&T> {
        TreeVec(self.0.iter().collect())
    }

    /// Pairs trees up, truncating to the shorter of the two.
    pub fn zip<U>(self, other: TreeVec<U>) -> TreeVec<(T, U)> {
        TreeVec(self.0.into_iter().zip(other.0).collect())
    }

    /// Pairs trees up; the tree counts must match.
    pub fn zip_eq<U>(self, other: TreeVec<U>) -> Result<TreeVec<(T, U)>, TreeVecError> {
        if self.0.len() != other.0.len() {
            return Err(TreeVecError::ShapeMismatch);
        }
        Ok(self.zip(other))
    }

    /// The trees in `[start, end)`.
    pub fn sub_tree_span(&self, start: usize, end: usize) -> Result<TreeVec<&T>, TreeVecError> {
        if start > end || end > self.0.len() {
            return Err(TreeVecError::InvalidSubTreeSpan);
        }
        Ok(TreeVec(self.0[start..end].iter().collect()))
    }
}

impl<T> TreeVec<Vec<T>> {
    /// Flattens tree / column nesting into a single column list, tree-major.
    pub fn flatten(self) -> Vec<T> {
        self.0.into_iter().flatten().collect()
    }

    /// Concatenates the columns of several tree vectors tree-by-tree. All
    /// inputs must agree on the tree count.
    pub fn concat_cols(
        parts: impl IntoIterator<Item = TreeVec<Vec<T>>>,
    ) -> Result<TreeVec<Vec<T>>, TreeVecError> {
        let mut result: Option<TreeVec<Vec<T>>> = None;
        for part in parts {
            result = Some(match result {
                None => part,
                Some(acc) => {
                    acc.zip_eq(part)?
                        .map(|(mut lhs, rhs)| {
                            lhs.extend(rhs);
                            lhs
                        })
                }
            });
        }
        Ok(result.unwrap_or_default())
    }
}

impl<T> Deref for TreeVec<T> {
    type Target = Vec<T>;
    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T> DerefMut for TreeVec<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}

impl<T> FromIterator<T> for TreeVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
