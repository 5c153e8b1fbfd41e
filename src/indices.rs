//! Data structures to hold point indices that may be either `u16` or `u32` to save space.

use std::cmp::Ordering;

use crate::error::{KnnIndexError, Result};

/// An owned permutation of point indices `0..n`, stored as `u16` when `n` fits and `u32`
/// otherwise.
///
/// The builder reorders this array in place so that every tree node covers a contiguous
/// sub-range of it. Once a tree is finished the permutation never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexArray {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexArray {
    /// Create the identity permutation over `num_items` points.
    pub fn identity(num_items: usize) -> Result<Self> {
        if num_items <= u16::MAX as usize + 1 {
            // `num_items` itself is never stored, only `0..num_items`
            Ok(Self::U16((0..num_items).map(|i| i as u16).collect()))
        } else if num_items <= u32::MAX as usize + 1 {
            Ok(Self::U32((0..num_items).map(|i| i as u32).collect()))
        } else {
            Err(KnnIndexError::TooManyPoints(num_items))
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U16(arr) => arr.len(),
            Self::U32(arr) => arr.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn bytes_per_element(&self) -> usize {
        match self {
            Self::U16(_) => 2,
            Self::U32(_) => 4,
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> usize {
        match self {
            Self::U16(arr) => arr[index] as usize,
            Self::U32(arr) => arr[index] as usize,
        }
    }

    #[inline]
    pub fn swap(&mut self, a: usize, b: usize) {
        match self {
            Self::U16(arr) => arr.swap(a, b),
            Self::U32(arr) => arr.swap(a, b),
        }
    }

    /// Reorder `start..end` so that the slot at `start + nth` holds the point that would be
    /// there if the range were sorted by `key`, with smaller keys before it and larger after.
    pub(crate) fn select_nth_by<T, K>(&mut self, start: usize, end: usize, nth: usize, key: K)
    where
        T: PartialOrd,
        K: Fn(usize) -> T,
    {
        let cmp = |a: usize, b: usize| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal);
        match self {
            Self::U16(arr) => {
                arr[start..end].select_nth_unstable_by(nth, |a, b| cmp(*a as usize, *b as usize));
            }
            Self::U32(arr) => {
                arr[start..end].select_nth_unstable_by(nth, |a, b| cmp(*a as usize, *b as usize));
            }
        }
    }

    /// Borrow this array as a read-only [`Indices`] view.
    pub fn as_indices(&self) -> Indices<'_> {
        match self {
            Self::U16(arr) => Indices::U16(arr),
            Self::U32(arr) => Indices::U32(arr),
        }
    }
}

/// A slice of indices that may be either `u16` or `u32`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Indices<'a> {
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl Indices<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::U16(arr) => arr.len(),
            Self::U32(arr) => arr.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> usize {
        match self {
            Self::U16(arr) => arr[index] as usize,
            Self::U32(arr) => arr[index] as usize,
        }
    }

    /// Copy these indices into a `Vec<usize>`.
    pub fn to_vec(&self) -> Vec<usize> {
        match self {
            Self::U16(arr) => arr.iter().map(|i| *i as usize).collect(),
            Self::U32(arr) => arr.iter().map(|i| *i as usize).collect(),
        }
    }

    /// Returns `true` if every value in `0..len` appears exactly once.
    pub fn is_permutation(&self) -> bool {
        let mut seen = vec![false; self.len()];
        for i in 0..self.len() {
            let value = self.get(i);
            if value >= seen.len() || seen[value] {
                return false;
            }
            seen[value] = true;
        }
        true
    }
}
