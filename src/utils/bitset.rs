//! A fixed-capacity bit vector.
//!
//! Used by the set-valued dataflow facts, where every tracked variable is
//! interned to a small dense index. Two sets only combine when their
//! capacities agree.

use std::fmt;

const WORD_BITS: usize = 64;

/// A set of small integers backed by 64-bit words.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    /// Creates an empty set able to hold indices `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            len: capacity,
        }
    }

    /// Creates a set containing every index in `0..capacity`.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Self::new(capacity);
        set.fill();
        set
    }

    /// Returns the capacity of the set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no index is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Adds `index`, returning `true` if it was not present before.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn insert(&mut self, index: usize) -> bool {
        assert!(index < self.len, "bit index {index} out of bounds");
        let mask = 1u64 << (index % WORD_BITS);
        let word = &mut self.words[index / WORD_BITS];
        let added = *word & mask == 0;
        *word |= mask;
        added
    }

    /// Removes `index`, returning `true` if it was present.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn remove(&mut self, index: usize) -> bool {
        assert!(index < self.len, "bit index {index} out of bounds");
        let mask = 1u64 << (index % WORD_BITS);
        let word = &mut self.words[index / WORD_BITS];
        let removed = *word & mask != 0;
        *word &= !mask;
        removed
    }

    /// Returns `true` if `index` is present. Out-of-range indices are never present.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        index < self.len && self.words[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    /// Returns the number of indices present.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Adds every index in `0..len`.
    pub fn fill(&mut self) {
        self.words.iter_mut().for_each(|w| *w = u64::MAX);
        let tail = self.len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }
    }

    /// In-place union. Returns `true` if `self` changed.
    ///
    /// # Panics
    ///
    /// Panics if the capacities differ.
    pub fn union_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a | b)
    }

    /// In-place intersection. Returns `true` if `self` changed.
    ///
    /// # Panics
    ///
    /// Panics if the capacities differ.
    pub fn intersect_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a & b)
    }

    /// In-place difference (`self \ other`). Returns `true` if `self` changed.
    ///
    /// # Panics
    ///
    /// Panics if the capacities differ.
    pub fn difference_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a & !b)
    }

    fn combine(&mut self, other: &Self, op: impl Fn(u64, u64) -> u64) -> bool {
        assert_eq!(self.len, other.len, "bit sets must have the same capacity");
        let mut changed = false;
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            let next = op(*a, b);
            changed |= next != *a;
            *a = next;
        }
        changed
    }

    /// Iterates the present indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(w * WORD_BITS + bit)
            })
        })
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let mut set = BitSet::new(130);
        assert!(set.insert(0));
        assert!(set.insert(129));
        assert!(!set.insert(129));
        assert!(set.contains(129));
        assert!(!set.contains(500));
        assert!(set.remove(0));
        assert!(!set.remove(0));
        assert_eq!(set.count(), 1);
    }

    #[test]
    fn test_full_respects_capacity() {
        let set = BitSet::full(70);
        assert_eq!(set.count(), 70);
        assert_eq!(set.iter().last(), Some(69));

        let exact = BitSet::full(64);
        assert_eq!(exact.count(), 64);
    }

    #[test]
    fn test_set_operations_report_change() {
        let mut a = BitSet::new(10);
        let mut b = BitSet::new(10);
        a.insert(1);
        a.insert(2);
        b.insert(2);
        b.insert(3);

        let mut union = a.clone();
        assert!(union.union_with(&b));
        assert_eq!(union.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(!union.union_with(&b));

        let mut inter = a.clone();
        assert!(inter.intersect_with(&b));
        assert_eq!(inter.iter().collect::<Vec<_>>(), vec![2]);

        assert!(a.difference_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_debug_format() {
        let mut set = BitSet::new(8);
        set.insert(3);
        set.insert(5);
        assert_eq!(format!("{set:?}"), "{3, 5}");
    }
}
