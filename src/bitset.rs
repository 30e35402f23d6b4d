// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of this software
// and associated documentation files (the "Software"), to deal in the Software without
// restriction, including without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all copies or
// substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

/// A growable-at-construction bitset, for the per-query "already visited" scratch state used by
/// render and collision traversal (see `bsp::render` and `bsp::collide`).
///
/// This plays the same role as `common::bitset::BitSet<const N_64: usize>` in the rest of this
/// codebase, but is sized at construction time rather than fixed at compile time: a render pass's
/// face count and a collision pass's brush count are both only known once a scene has been
/// loaded, so the const-generic form cannot be used here.
#[derive(Clone, Debug)]
pub struct DynBitSet {
    blocks: Box<[u64]>,
}

impl DynBitSet {
    /// Creates a bitset with room for at least `bits` bits, all initially unset.
    pub fn with_capacity(bits: usize) -> DynBitSet {
        let words = (bits + 63) / 64;
        DynBitSet {
            blocks: vec![0u64; words].into_boxed_slice(),
        }
    }

    #[inline]
    fn bit_location(bit: usize) -> (usize, u64) {
        (bit >> 6, 1 << (bit & 63))
    }

    #[inline]
    pub fn contains(&self, bit: usize) -> bool {
        let (index, mask) = Self::bit_location(bit);
        self.blocks[index] & mask != 0
    }

    #[inline]
    pub fn set(&mut self, bit: usize) {
        let (index, mask) = Self::bit_location(bit);
        self.blocks[index] |= mask;
    }

    #[inline]
    pub fn clear(&mut self, bit: usize) {
        let (index, mask) = Self::bit_location(bit);
        self.blocks[index] &= !mask;
    }

    /// Sets `bit` and returns whether it was already set beforehand. Traversal code uses this to
    /// make "already visited" checks idempotent in a single call: `if pass.tested.test_and_set(i)
    /// { return; }`.
    #[inline]
    pub fn test_and_set(&mut self, bit: usize) -> bool {
        let was_set = self.contains(bit);
        self.set(bit);
        was_set
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fresh_bitset_is_empty() {
        let bits = DynBitSet::with_capacity(200);
        for i in 0..200 {
            assert!(!bits.contains(i));
        }
    }

    #[test]
    fn test_set_clear_crosses_word_boundary() {
        let mut bits = DynBitSet::with_capacity(200);

        for i in &[0usize, 1, 63, 64, 65, 127, 128, 199] {
            bits.set(*i);
            assert!(bits.contains(*i));
            bits.clear(*i);
            assert!(!bits.contains(*i));
        }
    }

    #[test]
    fn test_test_and_set() {
        let mut bits = DynBitSet::with_capacity(8);
        assert_eq!(bits.test_and_set(3), false);
        assert_eq!(bits.test_and_set(3), true);
        assert!(bits.contains(3));
    }
}
