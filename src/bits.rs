//! Bit-packed primitives backing the traversal engine
//!
//! Three small structures tuned for the hybrid BFS inner loops:
//!
//! - [`BitSet`]: growable set of small integers with exact cardinality
//!   tracking, used for BFS frontiers.
//! - [`BitVec`]: fixed-size bit vector over `[0, n)`, used for visited
//!   marking.
//! - [`DistanceArray`]: saturating 16-bit distance storage where
//!   `u16::MAX` means "unvisited".
//!
//! All three pack 64 flags per word so a frontier over a million-node graph
//! costs ~125 KB instead of a megabyte-scale hash set.

use crate::error::GraphError;
use anyhow::Result;

const WORD_BITS: usize = 64;

#[inline]
const fn word_index(bit: u32) -> usize {
    bit as usize / WORD_BITS
}

#[inline]
const fn word_mask(bit: u32) -> u64 {
    1_u64 << (bit as usize % WORD_BITS)
}

/// Growable set of `u32` values with exact cardinality.
///
/// Insertion grows the backing storage on demand; set algebra
/// (union/intersection/difference) operates word-at-a-time and recounts
/// cardinality with popcounts.
///
/// # Example
///
/// ```
/// use canopy_graph::BitSet;
///
/// let mut frontier = BitSet::new();
/// frontier.insert(3);
/// frontier.insert(700);
/// assert_eq!(frontier.len(), 2);
/// assert!(frontier.contains(3));
/// assert!(!frontier.contains(4));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            len: 0,
        }
    }

    /// Create an empty set with room for values in `[0, capacity)`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            len: 0,
        }
    }

    /// Number of values in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a value. Returns `true` if it was not already present.
    pub fn insert(&mut self, value: u32) -> bool {
        let idx = word_index(value);
        if idx >= self.words.len() {
            self.words.resize(idx + 1, 0);
        }
        let mask = word_mask(value);
        let absent = self.words[idx] & mask == 0;
        if absent {
            self.words[idx] |= mask;
            self.len += 1;
        }
        absent
    }

    /// Remove a value. Returns `true` if it was present.
    pub fn remove(&mut self, value: u32) -> bool {
        let idx = word_index(value);
        if idx >= self.words.len() {
            return false;
        }
        let mask = word_mask(value);
        let present = self.words[idx] & mask != 0;
        if present {
            self.words[idx] &= !mask;
            self.len -= 1;
        }
        present
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, value: u32) -> bool {
        let idx = word_index(value);
        idx < self.words.len() && self.words[idx] & word_mask(value) != 0
    }

    /// Remove all values, keeping the allocation.
    pub fn clear(&mut self) {
        self.words.fill(0);
        self.len = 0;
    }

    /// Union in place: `self = self ∪ other`.
    pub fn union_with(&mut self, other: &Self) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w |= o;
        }
        self.recount();
    }

    /// Intersect in place: `self = self ∩ other`.
    pub fn intersect_with(&mut self, other: &Self) {
        for (i, w) in self.words.iter_mut().enumerate() {
            *w &= other.words.get(i).copied().unwrap_or(0);
        }
        self.recount();
    }

    /// Difference in place: `self = self \ other`.
    pub fn difference_with(&mut self, other: &Self) {
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w &= !o;
        }
        self.recount();
    }

    /// Exchange contents with another set. O(1), no copying.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// Iterate over the values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let base = (i * WORD_BITS) as u32;
            BitIter { word, base }
        })
    }

    fn recount(&mut self) {
        self.len = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }
}

/// Iterator over set bits of a single word.
struct BitIter {
    word: u64,
    base: u32,
}

impl Iterator for BitIter {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.word == 0 {
            return None;
        }
        let tz = self.word.trailing_zeros();
        self.word &= self.word - 1;
        Some(self.base + tz)
    }
}

/// Fixed-size bit vector over `[0, capacity)`.
///
/// Used as the BFS visited mask. All operations are O(1) except
/// [`BitVec::count_ones`], which popcounts the backing words.
///
/// Indices at or beyond `capacity` panic, as with slice indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVec {
    words: Vec<u64>,
    capacity: usize,
}

impl BitVec {
    /// Create a vector of `capacity` zero bits.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity,
        }
    }

    /// Number of addressable bits.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Set bit `index` to 1.
    pub fn set(&mut self, index: usize) {
        assert!(index < self.capacity, "bit index {index} out of bounds");
        self.words[index / WORD_BITS] |= 1 << (index % WORD_BITS);
    }

    /// Set bit `index` to 0.
    pub fn unset(&mut self, index: usize) {
        assert!(index < self.capacity, "bit index {index} out of bounds");
        self.words[index / WORD_BITS] &= !(1 << (index % WORD_BITS));
    }

    /// Flip bit `index`.
    pub fn toggle(&mut self, index: usize) {
        assert!(index < self.capacity, "bit index {index} out of bounds");
        self.words[index / WORD_BITS] ^= 1 << (index % WORD_BITS);
    }

    /// Read bit `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        assert!(index < self.capacity, "bit index {index} out of bounds");
        self.words[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    /// Number of set bits.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Sentinel distance meaning "unvisited".
pub const UNREACHED: u16 = u16::MAX;

/// Fixed-size array of 16-bit hop distances.
///
/// Entries start at [`UNREACHED`]; writing a value at or above the sentinel
/// is a contract violation and fails fast with
/// [`GraphError::DistanceOverflow`]. 16 bits cover any BFS on a graph with
/// fewer than 65535 levels, at a quarter of the footprint of `usize`
/// distances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceArray {
    values: Vec<u16>,
}

impl DistanceArray {
    /// Create an array of `len` unreached entries.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![UNREACHED; len],
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the array has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write a distance.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DistanceOverflow`] if `distance` is at or above
    /// the unreached sentinel.
    pub fn set(&mut self, index: usize, distance: u32) -> Result<()> {
        if distance >= u32::from(UNREACHED) {
            return Err(GraphError::DistanceOverflow(distance).into());
        }
        #[allow(clippy::cast_possible_truncation)] // checked against UNREACHED above
        {
            self.values[index] = distance as u16;
        }
        Ok(())
    }

    /// Read the distance at `index`; [`UNREACHED`] if never set.
    #[must_use]
    pub fn get(&self, index: usize) -> u16 {
        self.values[index]
    }

    /// Whether `index` still holds the sentinel.
    #[must_use]
    pub fn is_unreached(&self, index: usize) -> bool {
        self.values[index] == UNREACHED
    }

    /// Raw view of the distances.
    #[must_use]
    pub fn as_slice(&self) -> &[u16] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_insert_remove_contains() {
        let mut set = BitSet::new();
        assert!(set.is_empty());

        assert!(set.insert(5));
        assert!(!set.insert(5)); // already present
        assert!(set.insert(64)); // second word
        assert!(set.insert(1000)); // forces growth

        assert_eq!(set.len(), 3);
        assert!(set.contains(5));
        assert!(set.contains(64));
        assert!(set.contains(1000));
        assert!(!set.contains(6));
        assert!(!set.contains(100_000)); // beyond allocated words

        assert!(set.remove(64));
        assert!(!set.remove(64));
        assert_eq!(set.len(), 2);
        assert!(!set.contains(64));
    }

    #[test]
    fn test_bitset_iter_ascending() {
        let mut set = BitSet::new();
        for v in [900, 3, 64, 65, 0] {
            set.insert(v);
        }
        let values: Vec<u32> = set.iter().collect();
        assert_eq!(values, vec![0, 3, 64, 65, 900]);
    }

    #[test]
    fn test_bitset_union_intersect_difference() {
        let mut a = BitSet::new();
        let mut b = BitSet::new();
        for v in [1, 2, 3, 200] {
            a.insert(v);
        }
        for v in [2, 3, 4] {
            b.insert(v);
        }

        let mut union = a.clone();
        union.union_with(&b);
        assert_eq!(union.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 200]);
        assert_eq!(union.len(), 5);

        let mut inter = a.clone();
        inter.intersect_with(&b);
        assert_eq!(inter.iter().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(inter.len(), 2);

        let mut diff = a.clone();
        diff.difference_with(&b);
        assert_eq!(diff.iter().collect::<Vec<_>>(), vec![1, 200]);
        assert_eq!(diff.len(), 2);
    }

    #[test]
    fn test_bitset_swap_and_clear() {
        let mut a = BitSet::new();
        let mut b = BitSet::new();
        a.insert(1);
        b.insert(2);
        b.insert(3);

        a.swap(&mut b);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        assert!(a.contains(2));
        assert!(b.contains(1));

        a.clear();
        assert!(a.is_empty());
        assert!(!a.contains(2));
    }

    #[test]
    fn test_bitvec_basic() {
        let mut bits = BitVec::new(130);
        assert_eq!(bits.capacity(), 130);
        assert_eq!(bits.count_ones(), 0);

        bits.set(0);
        bits.set(64);
        bits.set(129);
        assert!(bits.get(0));
        assert!(bits.get(64));
        assert!(bits.get(129));
        assert!(!bits.get(1));
        assert_eq!(bits.count_ones(), 3);

        bits.unset(64);
        assert!(!bits.get(64));

        bits.toggle(64);
        assert!(bits.get(64));
        bits.toggle(64);
        assert!(!bits.get(64));
        assert_eq!(bits.count_ones(), 2);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_bitvec_out_of_bounds() {
        let bits = BitVec::new(10);
        bits.get(10);
    }

    #[test]
    fn test_distance_array() {
        let mut dist = DistanceArray::new(4);
        assert_eq!(dist.len(), 4);
        assert!(dist.is_unreached(0));
        assert_eq!(dist.get(0), UNREACHED);

        dist.set(0, 0).unwrap();
        dist.set(1, 7).unwrap();
        assert_eq!(dist.get(0), 0);
        assert_eq!(dist.get(1), 7);
        assert!(!dist.is_unreached(1));
        assert!(dist.is_unreached(2));
    }

    #[test]
    fn test_distance_overflow_fails_fast() {
        let mut dist = DistanceArray::new(1);
        let err = dist.set(0, u32::from(UNREACHED)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::GraphError>(),
            Some(crate::GraphError::DistanceOverflow(65535))
        ));
        // Value untouched on failure.
        assert!(dist.is_unreached(0));
    }
}
