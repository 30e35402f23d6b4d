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

//! Potentially Visible Set — `SPEC_FULL.md` §4.D.

/// The compiled cluster-visibility bitmap: `cluster_count` rows, `bytes_per_cluster` bytes each,
/// bit `cam` of row `test`'s byte array set iff cluster `test` can see cluster `cam`.
#[derive(Clone, Debug)]
pub struct VisData {
    cluster_count: usize,
    bytes_per_cluster: usize,
    bits: Vec<u8>,
}

impl VisData {
    pub fn new(cluster_count: usize, bytes_per_cluster: usize, bits: Vec<u8>) -> VisData {
        VisData {
            cluster_count,
            bytes_per_cluster,
            bits,
        }
    }

    /// An empty PVS, as used for scenes with no compiled visibility lump. Every
    /// [`VisData::cluster_visible`] query against it returns `true` (degenerate "everything
    /// visible" behavior per §7).
    pub fn empty() -> VisData {
        VisData {
            cluster_count: 0,
            bytes_per_cluster: 0,
            bits: Vec::new(),
        }
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    pub fn bytes_per_cluster(&self) -> usize {
        self.bytes_per_cluster
    }

    /// Whether `test` is visible from `cam`.
    ///
    /// `cam < 0` or `test < 0` (a leaf belonging to no cluster) always answers `true`, as does an
    /// empty PVS lump — both are "always visible" per `SPEC_FULL.md` §4.D/§7.
    pub fn cluster_visible(&self, test: i32, cam: i32) -> bool {
        if cam < 0 || test < 0 || self.bits.is_empty() {
            return true;
        }

        let byte_index = test as usize * self.bytes_per_cluster + (cam as usize / 8);
        match self.bits.get(byte_index) {
            Some(byte) => (byte >> (cam as usize % 8)) & 1 != 0,
            // A reference past the end of a (non-empty) PVS lump is treated as visible, matching
            // the loader's general out-of-range tolerance (§7).
            None => true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_visdata_always_visible() {
        let vis = VisData::empty();
        assert!(vis.cluster_visible(0, 0));
        assert!(vis.cluster_visible(5, 9));
    }

    #[test]
    fn test_negative_cluster_always_visible() {
        let vis = VisData::new(2, 1, vec![0b0000_0001, 0b0000_0010]);
        assert!(vis.cluster_visible(-1, 0));
        assert!(vis.cluster_visible(0, -1));
    }

    #[test]
    fn test_bit_indexing() {
        // cluster 0 can see cluster 0 only; cluster 1 can see cluster 1 only.
        let vis = VisData::new(2, 1, vec![0b0000_0001, 0b0000_0010]);
        assert!(vis.cluster_visible(0, 0));
        assert!(!vis.cluster_visible(0, 1));
        assert!(vis.cluster_visible(1, 1));
        assert!(!vis.cluster_visible(1, 0));
    }

    #[test]
    fn test_multi_byte_rows() {
        // cluster_count=1, bytes_per_cluster=2: bit 9 (cam=9) is byte 1, bit 1.
        let vis = VisData::new(1, 2, vec![0b0000_0000, 0b0000_0010]);
        assert!(vis.cluster_visible(0, 9));
        assert!(!vis.cluster_visible(0, 8));
    }
}
