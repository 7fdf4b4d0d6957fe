// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::cmp::Ordering;

use crate::error::Error;
use crate::hash::HashId;
use crate::hash::HashSetId;

/// A Bloom filter over byte strings.
///
/// The bit array is fixed at construction; bits are addressed most
/// significant first within each byte, which keeps the array byte-identical
/// with filters produced by other implementations of the model format. Bits
/// at positions `>= bitsize` in the final byte are never set nor inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    /// Number of addressable bits (m).
    bitsize: u64,
    /// Bit array of `ceil(bitsize / 8)` bytes.
    bits: Vec<u8>,
    /// Ordered hash sequence; every member addresses one bit per item.
    hashes: Vec<HashId>,
}

impl BloomFilter {
    /// Creates a filter of the given bit size with all bits zero and no
    /// hashes bound.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `bitsize` is zero.
    pub fn new(bitsize: u64) -> Result<Self, Error> {
        if bitsize == 0 {
            return Err(Error::invalid_argument("filter bitsize must be at least 1"));
        }
        let num_bytes = usize::try_from(bitsize.div_ceil(8))
            .map_err(|_| Error::invalid_argument("filter bitsize exceeds the address space"))?;

        Ok(BloomFilter {
            bitsize,
            bits: vec![0u8; num_bytes],
            hashes: Vec::new(),
        })
    }

    /// Creates a filter with one of the named hash packs bound.
    pub fn with_hash_set(bitsize: u64, set: HashSetId) -> Result<Self, Error> {
        let mut filter = Self::new(bitsize)?;
        filter.bind_hashes(set.ids());
        Ok(filter)
    }

    /// Used by the deserializers: assembles a filter from its parts.
    pub(crate) fn from_parts(
        bitsize: u64,
        bits: Vec<u8>,
        hashes: Vec<HashId>,
    ) -> Result<Self, Error> {
        let filter = Self::new(bitsize)?;
        if bits.len() != filter.bits.len() {
            return Err(Error::truncated_payload(format!(
                "filter array holds {} bytes, bitsize {} requires {}",
                bits.len(),
                bitsize,
                filter.bits.len()
            )));
        }
        Ok(BloomFilter {
            bitsize,
            bits,
            hashes,
        })
    }

    /// Replaces the bound hash sequence.
    pub fn bind_hashes(&mut self, ids: &[HashId]) {
        self.hashes = ids.to_vec();
    }

    // ========================================================================
    // Query and update operations
    // ========================================================================

    /// Tests whether an item is possibly in the set.
    ///
    /// Returns `true` if the item was possibly inserted (or is a false
    /// positive) and `false` if it was definitely not inserted.
    pub fn contains(&self, item: &[u8]) -> bool {
        self.hashes
            .iter()
            .all(|&id| self.get_bit(self.bit_index(id, item)))
    }

    /// Inserts an item into the filter.
    ///
    /// After insertion, `contains(item)` will always return `true`.
    pub fn insert(&mut self, item: &[u8]) {
        for i in 0..self.hashes.len() {
            let bit = self.bit_index(self.hashes[i], item);
            self.set_bit(bit);
        }
    }

    /// Tests and inserts an item in a single pass over the hash sequence.
    ///
    /// Returns whether the item was possibly already in the set before the
    /// insertion.
    pub fn contains_and_insert(&mut self, item: &[u8]) -> bool {
        let mut was_present = true;
        for i in 0..self.hashes.len() {
            let bit = self.bit_index(self.hashes[i], item);
            if !self.get_bit(bit) {
                was_present = false;
            }
            self.set_bit(bit);
        }
        was_present
    }

    /// Zeroes all bits while preserving size and hash binding.
    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    // ========================================================================
    // Statistics and properties
    // ========================================================================

    /// Exact number of 1-bits across the whole array.
    ///
    /// Counting walks machine-word-sized blocks so the hardware population
    /// count instruction applies.
    pub fn popcount(&self) -> u64 {
        let mut words = self.bits.chunks_exact(8);
        let mut count: u64 = 0;
        for word in &mut words {
            let w = u64::from_ne_bytes([
                word[0], word[1], word[2], word[3], word[4], word[5], word[6], word[7],
            ]);
            count += u64::from(w.count_ones());
        }
        for &b in words.remainder() {
            count += u64::from(b.count_ones());
        }
        count
    }

    /// Fraction of 1-bits, `popcount / bitsize`.
    pub fn saturation(&self) -> f64 {
        self.popcount() as f64 / self.bitsize as f64
    }

    /// Returns the number of addressable bits.
    pub fn bitsize(&self) -> u64 {
        self.bitsize
    }

    /// Returns the size of the bit array in bytes.
    pub fn num_bytes(&self) -> usize {
        self.bits.len()
    }

    /// Returns the raw bit array.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Returns the bound hash sequence.
    pub fn hashes(&self) -> &[HashId] {
        &self.hashes
    }

    /// Total order used by the serialization layer: bitsize first, then byte
    /// length, then the byte arrays lexicographically. The hash binding does
    /// not participate.
    pub fn compare(&self, other: &BloomFilter) -> Ordering {
        self.bitsize
            .cmp(&other.bitsize)
            .then_with(|| self.bits.len().cmp(&other.bits.len()))
            .then_with(|| self.bits.cmp(&other.bits))
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn bit_index(&self, id: HashId, item: &[u8]) -> u64 {
        u64::from(id.eval(item)) % self.bitsize
    }

    fn get_bit(&self, index: u64) -> bool {
        let byte = (index / 8) as usize;
        let mask = 0x80u8 >> (index % 8);
        self.bits[byte] & mask != 0
    }

    fn set_bit(&mut self, index: u64) {
        let byte = (index / 8) as usize;
        let mask = 0x80u8 >> (index % 8);
        self.bits[byte] |= mask;
    }
}
