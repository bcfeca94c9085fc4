//! # Growable Bit Vector
//!
//! Dense set of non-negative indices stored as 64-bit groups.
//!
//! ```text
//! groups:  [ g0 ][ g1 ][ g2 ] ...
//! bit i -> group i / 64, offset i % 64
//! ```
//!
//! Groups past the stored length are implicitly zero, so a vector never has to
//! materialize storage for unset high bits. Two vectors that differ only in
//! trailing zero groups are equal and hash identically.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Bits per storage group.
const GROUP_BITS: usize = 64;

/// log2(`GROUP_BITS`).
const GROUP_SHIFT: usize = 6;

/// Mask selecting the in-group offset.
const GROUP_MASK: usize = GROUP_BITS - 1;

#[inline]
const fn split(index: usize) -> (usize, usize) {
    (index >> GROUP_SHIFT, index & GROUP_MASK)
}

/// Growable set of bit indices.
///
/// # Example
///
/// ```rust
/// use tessera_core::BitVector;
///
/// let mut bits = BitVector::from_indices([1, 64, 130]);
/// assert!(bits.get(64));
/// bits.set(64, false);
/// assert_eq!(bits.to_index_list(), vec![1, 130]);
/// ```
#[derive(Clone, Default)]
pub struct BitVector {
    groups: Vec<u64>,
}

impl BitVector {
    /// Creates an empty vector. No storage is allocated until a bit is set.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Creates a vector with every listed index set.
    #[must_use]
    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        let mut bits = Self::new();
        for index in indices {
            bits.set(index, true);
        }
        bits
    }

    /// Number of stored groups, including trailing zero groups.
    #[inline]
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns the bit at `index`. Indices past the stored length read as `false`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        let (group, offset) = split(index);
        self.groups
            .get(group)
            .is_some_and(|bits| bits & (1 << offset) != 0)
    }

    /// Sets the bit at `index`, growing storage when needed.
    ///
    /// Clearing a bit past the stored length is a no-op and does not grow.
    pub fn set(&mut self, index: usize, value: bool) {
        let (group, offset) = split(index);

        if group >= self.groups.len() {
            if !value {
                return;
            }
            self.groups.resize(group + 1, 0);
        }

        if value {
            self.groups[group] |= 1 << offset;
        } else {
            self.groups[group] &= !(1 << offset);
        }
    }

    /// Inverts the bit at `index`.
    #[inline]
    pub fn flip(&mut self, index: usize) {
        let current = self.get(index);
        self.set(index, !current);
    }

    /// Returns the previous value of the bit at `index` and sets it.
    ///
    /// Indices past the stored length return `false` and leave the vector unchanged.
    pub fn get_and_set(&mut self, index: usize) -> bool {
        let (group, offset) = split(index);
        match self.groups.get_mut(group) {
            Some(bits) => {
                let was = *bits & (1 << offset) != 0;
                *bits |= 1 << offset;
                was
            }
            None => false,
        }
    }

    /// Returns the previous value of the bit at `index` and clears it.
    pub fn get_and_clear(&mut self, index: usize) -> bool {
        let (group, offset) = split(index);
        match self.groups.get_mut(group) {
            Some(bits) => {
                let was = *bits & (1 << offset) != 0;
                *bits &= !(1 << offset);
                was
            }
            None => false,
        }
    }

    /// Drops all storage. Every bit reads as `false` afterwards.
    #[inline]
    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Inverts every stored group in place.
    ///
    /// Bits past the stored length stay implicitly zero; they are not materialized.
    pub fn invert(&mut self) -> &mut Self {
        for bits in &mut self.groups {
            *bits = !*bits;
        }
        self
    }

    /// Bitwise AND with `other`.
    ///
    /// Groups past the shorter operand are dropped, so those bits become zero.
    pub fn and(&mut self, other: &Self) -> &mut Self {
        let common = self.groups.len().min(other.groups.len());
        self.groups.truncate(common);
        for (bits, rhs) in self.groups.iter_mut().zip(&other.groups) {
            *bits &= rhs;
        }
        self
    }

    /// Bitwise OR with `other` over the overlapping group range.
    ///
    /// The receiver does not grow: bits of `other` past the receiver's stored
    /// length are not copied.
    pub fn or(&mut self, other: &Self) -> &mut Self {
        for (bits, rhs) in self.groups.iter_mut().zip(&other.groups) {
            *bits |= rhs;
        }
        self
    }

    /// Bitwise XOR with `other` over the overlapping group range.
    pub fn xor(&mut self, other: &Self) -> &mut Self {
        for (bits, rhs) in self.groups.iter_mut().zip(&other.groups) {
            *bits ^= rhs;
        }
        self
    }

    /// Returns `true` if no bit is set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|&bits| bits == 0)
    }

    /// Returns `true` if every bit set in `other` is also set in `self`.
    #[must_use]
    pub fn contains_all(&self, other: &Self) -> bool {
        let common = self.groups.len().min(other.groups.len());

        // bits of `other` past our length have no counterpart here
        if other.groups[common..].iter().any(|&bits| bits != 0) {
            return false;
        }

        self.groups[..common]
            .iter()
            .zip(&other.groups[..common])
            .all(|(&ours, &theirs)| ours & theirs == theirs)
    }

    /// Returns `true` if `self` and `other` share at least one set bit.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.groups
            .iter()
            .zip(&other.groups)
            .any(|(&ours, &theirs)| ours & theirs != 0)
    }

    /// Structural equality: trailing zero groups are ignored.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }

    /// Returns all set indices in ascending order.
    #[must_use]
    pub fn to_index_list(&self) -> Vec<usize> {
        self.iter().collect()
    }

    /// Iterates set indices in ascending order.
    pub fn iter(&self) -> Ones<'_> {
        Ones {
            groups: &self.groups,
            group: 0,
            current: self.groups.first().copied().unwrap_or(0),
        }
    }

    /// Stored groups with trailing zero groups removed.
    fn significant(&self) -> &[u64] {
        let len = self
            .groups
            .iter()
            .rposition(|&bits| bits != 0)
            .map_or(0, |last| last + 1);
        &self.groups[..len]
    }
}

impl PartialEq for BitVector {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for BitVector {}

impl Hash for BitVector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<usize> for BitVector {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::from_indices(iter)
    }
}

impl Extend<usize> for BitVector {
    fn extend<I: IntoIterator<Item = usize>>(&mut self, iter: I) {
        for index in iter {
            self.set(index, true);
        }
    }
}

impl<'a> IntoIterator for &'a BitVector {
    type Item = usize;
    type IntoIter = Ones<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over the set indices of a [`BitVector`].
pub struct Ones<'a> {
    groups: &'a [u64],
    group: usize,
    current: u64,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.group += 1;
            self.current = *self.groups.get(self.group)?;
        }

        let offset = self.current.trailing_zeros() as usize;
        // clear lowest set bit
        self.current &= self.current - 1;
        Some((self.group << GROUP_SHIFT) | offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_vector(rng: &mut StdRng, max_index: usize) -> BitVector {
        let count = rng.gen_range(0..32);
        (0..count).map(|_| rng.gen_range(0..max_index)).collect()
    }

    #[test]
    fn test_fresh_vector_reads_false() {
        let bits = BitVector::new();
        for index in [0, 1, 63, 64, 65, 4096, 1_000_000] {
            assert!(!bits.get(index));
        }
        assert!(bits.is_empty());
        assert_eq!(bits.group_count(), 0);
    }

    #[test]
    fn test_set_and_clear_across_groups() {
        let mut bits = BitVector::new();
        for index in [0, 63, 64, 1_000_000] {
            bits.set(index, true);
            assert!(bits.get(index), "bit {index} should be set");
            bits.set(index, false);
            assert!(!bits.get(index), "bit {index} should be clear");
        }
        assert_eq!(bits.group_count(), 1_000_000 / 64 + 1);
        assert!(bits.is_empty());
    }

    #[test]
    fn test_clearing_unstored_bit_does_not_grow() {
        let mut bits = BitVector::new();
        bits.set(500, false);
        assert_eq!(bits.group_count(), 0);
    }

    #[test]
    fn test_flip() {
        let mut bits = BitVector::new();
        bits.flip(70);
        assert!(bits.get(70));
        bits.flip(70);
        assert!(!bits.get(70));
    }

    #[test]
    fn test_get_and_set_get_and_clear() {
        let mut bits = BitVector::from_indices([3]);
        assert!(!bits.get_and_set(4));
        assert!(bits.get(4));
        assert!(bits.get_and_set(4));

        assert!(bits.get_and_clear(3));
        assert!(!bits.get(3));
        assert!(!bits.get_and_clear(3));

        // past the stored length nothing changes
        assert!(!bits.get_and_set(200));
        assert!(!bits.get(200));
    }

    #[test]
    fn test_double_invert_is_identity() {
        let mut rng = StdRng::seed_from_u64(0xdead_beef);
        for _ in 0..200 {
            let original = random_vector(&mut rng, 300);
            let mut copy = original.clone();
            copy.invert().invert();
            assert!(copy.equals(&original));
        }
    }

    #[test]
    fn test_invert_only_touches_stored_groups() {
        let mut bits = BitVector::from_indices([0]);
        bits.invert();
        assert!(!bits.get(0));
        assert!(bits.get(1));
        assert!(bits.get(63));
        assert!(!bits.get(64));
    }

    #[test]
    fn test_and_drops_bits_past_shorter_operand() {
        let mut long = BitVector::from_indices([1, 100]);
        let short = BitVector::from_indices([1, 2]);
        long.and(&short);
        assert_eq!(long.to_index_list(), vec![1]);
        assert!(!long.get(100));
    }

    #[test]
    fn test_or_and_xor_use_overlapping_range() {
        let mut a = BitVector::from_indices([1, 2]);
        let b = BitVector::from_indices([2, 3, 200]);
        a.or(&b);
        assert_eq!(a.to_index_list(), vec![1, 2, 3]);

        let mut c = BitVector::from_indices([1, 2]);
        c.xor(&b);
        assert_eq!(c.to_index_list(), vec![1, 3]);
    }

    #[test]
    fn test_contains_all_with_shorter_receiver() {
        let short = BitVector::from_indices([1]);
        let long = BitVector::from_indices([1, 130]);
        assert!(!short.contains_all(&long));
        assert!(long.contains_all(&short));

        // trailing zero groups in `other` are not "missing" bits
        let mut padded = BitVector::from_indices([1, 130]);
        padded.set(130, false);
        assert!(short.contains_all(&padded));
    }

    #[test]
    fn test_contains_all_empty() {
        let empty = BitVector::new();
        let bits = BitVector::from_indices([5]);
        assert!(bits.contains_all(&empty));
        assert!(empty.contains_all(&empty));
        assert!(!empty.contains_all(&bits));
    }

    #[test]
    fn test_intersects_with_shorter_operand() {
        let short = BitVector::from_indices([2]);
        let long = BitVector::from_indices([3, 190]);
        assert!(!short.intersects(&long));
        assert!(!long.intersects(&short));

        let other = BitVector::from_indices([2, 190]);
        assert!(short.intersects(&other));
        assert!(!BitVector::new().intersects(&other));
    }

    #[test]
    fn test_mutual_containment_implies_equality() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let a = random_vector(&mut rng, 300);
            let b = random_vector(&mut rng, 300);
            if a.contains_all(&b) && b.contains_all(&a) {
                assert!(a.equals(&b));
            }

            // same bits over a longer backing store
            let mut padded: BitVector = a.iter().collect();
            let spill = rng.gen_range(320..1000);
            padded.set(spill, true);
            padded.set(spill, false);
            assert!(padded.group_count() > a.group_count());
            assert!(padded.contains_all(&a) && a.contains_all(&padded));
            assert!(padded.equals(&a) && a.equals(&padded));

            // one extra bit breaks mutual containment
            padded.set(spill, true);
            assert!(padded.contains_all(&a));
            assert!(!a.contains_all(&padded));
            assert!(!padded.equals(&a));
        }
    }

    #[test]
    fn test_equality_ignores_trailing_zero_groups() {
        let mut a = BitVector::from_indices([1, 1000]);
        a.set(1000, false);
        let b = BitVector::from_indices([1]);
        assert_eq!(a, b);
        assert_eq!(BitVector::new(), BitVector::from_indices([]));

        use std::collections::hash_map::DefaultHasher;
        let hash = |bits: &BitVector| {
            let mut hasher = DefaultHasher::new();
            bits.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn test_index_list_is_ascending() {
        let bits = BitVector::from_indices([300, 5, 64, 0, 63]);
        assert_eq!(bits.to_index_list(), vec![0, 5, 63, 64, 300]);
    }

    #[test]
    fn test_clear() {
        let mut bits = BitVector::from_indices([9, 99]);
        bits.clear();
        assert!(bits.is_empty());
        assert_eq!(bits.group_count(), 0);
    }
}
