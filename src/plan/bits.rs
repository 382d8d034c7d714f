//! Fixed-length slot bit sequences.

use std::fmt;
use std::ops::Range;

const WORD_BITS: usize = u64::BITS as usize;

/// A fixed-length sequence of bits, one per slot of a day.
///
/// Bit `i` corresponds to slot `i`. The length is fixed at construction and
/// every binary operation requires both operands to have the same length.
///
/// # Examples
///
/// ```
/// use twin_planner::plan::bits::SlotBits;
///
/// let mut bits = SlotBits::zeros(24);
/// bits.set_range(10..14);
/// assert_eq!(bits.count_ones(), 4);
/// assert_eq!(bits.to_u64(), Some(0b1111 << 10));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SlotBits {
    len: usize,
    words: Vec<u64>,
}

impl SlotBits {
    /// Creates an all-zero sequence of `len` bits.
    pub fn zeros(len: usize) -> Self {
        Self {
            len,
            words: vec![0; len.div_ceil(WORD_BITS)],
        }
    }

    /// Builds a sequence with the given slots set.
    ///
    /// # Errors
    ///
    /// Returns the first slot index that falls outside `[0, len)`.
    pub fn try_from_slots(
        len: usize,
        slots: impl IntoIterator<Item = usize>,
    ) -> Result<Self, usize> {
        let mut bits = Self::zeros(len);
        for slot in slots {
            if slot >= len {
                return Err(slot);
            }
            bits.set(slot);
        }
        Ok(bits)
    }

    /// Decodes the storage integer form (bit `i` = slot `i`).
    ///
    /// Returns `None` if `len > 64` or `value` has bits at or above `len`.
    pub fn from_u64(value: u64, len: usize) -> Option<Self> {
        if len > WORD_BITS {
            return None;
        }
        if len < WORD_BITS && value >> len != 0 {
            return None;
        }
        let mut bits = Self::zeros(len);
        if let Some(word) = bits.words.first_mut() {
            *word = value;
        }
        Some(bits)
    }

    /// Encodes to the storage integer form, or `None` if `len > 64`.
    pub fn to_u64(&self) -> Option<u64> {
        if self.len > WORD_BITS {
            return None;
        }
        Some(self.words.first().copied().unwrap_or(0))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the bit at `slot`; slots outside the sequence read as unset.
    pub fn get(&self, slot: usize) -> bool {
        slot < self.len && self.words[slot / WORD_BITS] & (1 << (slot % WORD_BITS)) != 0
    }

    /// Sets the bit at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= len`.
    pub fn set(&mut self, slot: usize) {
        assert!(slot < self.len, "slot {slot} out of range 0..{}", self.len);
        self.words[slot / WORD_BITS] |= 1 << (slot % WORD_BITS);
    }

    /// Sets every bit in `range`.
    ///
    /// # Panics
    ///
    /// Panics if `range.end > len`.
    pub fn set_range(&mut self, range: Range<usize>) {
        for slot in range {
            self.set(slot);
        }
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns `true` if any bit is set.
    pub fn any(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    /// Iterates the indices of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&slot| self.get(slot))
    }

    pub fn first_one(&self) -> Option<usize> {
        self.iter_ones().next()
    }

    pub fn last_one(&self) -> Option<usize> {
        (0..self.len).rev().find(|&slot| self.get(slot))
    }

    /// Bitwise OR.
    ///
    /// # Panics
    ///
    /// Panics if the lengths differ.
    pub fn union(&self, other: &Self) -> Self {
        self.zip_words(other, |a, b| a | b)
    }

    /// Bitwise AND.
    ///
    /// # Panics
    ///
    /// Panics if the lengths differ.
    pub fn intersection(&self, other: &Self) -> Self {
        self.zip_words(other, |a, b| a & b)
    }

    /// Bits set in `self` but not in `other`.
    ///
    /// # Panics
    ///
    /// Panics if the lengths differ.
    pub fn difference(&self, other: &Self) -> Self {
        self.zip_words(other, |a, b| a & !b)
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.len == other.len && self.words.iter().zip(&other.words).all(|(a, b)| a & b == 0)
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.len == other.len && self.words.iter().zip(&other.words).all(|(a, b)| a & !b == 0)
    }

    fn zip_words(&self, other: &Self, op: impl Fn(u64, u64) -> u64) -> Self {
        assert_eq!(self.len, other.len, "slot sequences differ in length");
        Self {
            len: self.len,
            words: self
                .words
                .iter()
                .zip(&other.words)
                .map(|(&a, &b)| op(a, b))
                .collect(),
        }
    }
}

/// Renders slot 0 first, e.g. `000011110000`.
impl fmt::Display for SlotBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for slot in 0..self.len {
            f.write_str(if self.get(slot) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for SlotBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotBits({self})")
    }
}
