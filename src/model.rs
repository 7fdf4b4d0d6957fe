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

//! The detector model: extraction parameters bound to a Bloom filter.
//!
//! A model carries the n-gram length, the bit-level flag, the delimiter set
//! and the filter itself, and guarantees they stay consistent: parameters
//! may only change while the filter is still empty, and two models can be
//! compared for specification equivalence before dual-filter scoring.
//!
//! # Usage
//!
//! ```rust
//! use salad::hash::HashSetId;
//! use salad::model::Model;
//!
//! let mut model = Model::new(1 << 20, HashSetId::Simple, 3, false, "")?;
//! model.train(b"abcabc");
//! assert!(model.filter().contains(b"abc"));
//! # Ok::<(), salad::error::Error>(())
//! ```

use crate::bloom::BloomFilter;
use crate::error::Error;
use crate::hash::HashSetId;
use crate::ngram::Delimiters;
use crate::ngram::MAX_BIT_NGRAM;
use crate::ngram::for_each_ngram;

/// The unit of the n-gram alphabet a model extracts over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NgramMode {
    /// Overlapping windows of single bits, network order.
    Bit,
    /// Overlapping windows of raw bytes.
    Byte,
    /// Windows of delimiter-separated tokens.
    Token,
}

/// Extraction parameters and the trained filter, kept consistent.
#[derive(Debug, Clone)]
pub struct Model {
    ngram_len: usize,
    binary: bool,
    delimiters: Delimiters,
    filter: BloomFilter,
    trained: bool,
}

impl Model {
    /// Creates an untrained model.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `ngram_len` is zero, if `filter_bitsize` is
    /// zero, or if `binary` is set with `ngram_len` beyond the word width.
    pub fn new(
        filter_bitsize: u64,
        hash_set: HashSetId,
        ngram_len: usize,
        binary: bool,
        delimiter: &str,
    ) -> Result<Model, Error> {
        let filter = BloomFilter::with_hash_set(filter_bitsize, hash_set)?;
        Self::from_parts(ngram_len, binary, Delimiters::from_spec(delimiter), filter)
    }

    /// Assembles a model from already-constructed parts, validating the
    /// combined specification. Deserializers land here.
    pub(crate) fn from_parts(
        ngram_len: usize,
        binary: bool,
        delimiters: Delimiters,
        filter: BloomFilter,
    ) -> Result<Model, Error> {
        validate_ngram_len(ngram_len, binary)?;
        if filter.hashes().is_empty() {
            return Err(Error::invalid_argument("the hash set must not be empty"));
        }
        let trained = filter.popcount() > 0;
        Ok(Model {
            ngram_len,
            binary,
            delimiters,
            filter,
            trained,
        })
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// The n-gram length, in bits, bytes or tokens depending on the mode.
    pub fn ngram_len(&self) -> usize {
        self.ngram_len
    }

    /// Whether n-grams are evaluated on the bit level.
    pub fn binary(&self) -> bool {
        self.binary
    }

    /// The token delimiter set; empty outside token mode.
    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// The trained filter.
    pub fn filter(&self) -> &BloomFilter {
        &self.filter
    }

    /// The extraction mode the parameters select.
    pub fn mode(&self) -> NgramMode {
        if self.binary {
            NgramMode::Bit
        } else if self.delimiters.is_empty() {
            NgramMode::Byte
        } else {
            NgramMode::Token
        }
    }

    /// Changes the n-gram length. Rejected once training has begun.
    pub fn set_ngram_len(&mut self, ngram_len: usize) -> Result<(), Error> {
        self.check_mutable()?;
        validate_ngram_len(ngram_len, self.binary)?;
        self.ngram_len = ngram_len;
        Ok(())
    }

    /// Switches bit-level extraction on or off. Rejected once training has
    /// begun.
    pub fn set_binary(&mut self, binary: bool) -> Result<(), Error> {
        self.check_mutable()?;
        validate_ngram_len(self.ngram_len, binary)?;
        self.binary = binary;
        Ok(())
    }

    /// Replaces the delimiter set. Rejected once training has begun.
    pub fn set_delimiters(&mut self, delimiter: &str) -> Result<(), Error> {
        self.check_mutable()?;
        self.delimiters = Delimiters::from_spec(delimiter);
        Ok(())
    }

    fn check_mutable(&self) -> Result<(), Error> {
        if self.trained {
            return Err(Error::invalid_argument(
                "parameters are frozen once training has begun",
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Training and extraction
    // ========================================================================

    /// Inserts every n-gram of the sample into the filter.
    ///
    /// Training twice on the same data leaves the filter bit-identical;
    /// Bloom insertion is idempotent by construction.
    pub fn train(&mut self, sample: &[u8]) {
        self.trained = true;
        let filter = &mut self.filter;
        for_each_ngram(
            sample,
            self.ngram_len,
            self.binary,
            &self.delimiters,
            |gram| filter.insert(gram),
        );
    }

    /// Trains on a batch of samples, preserving order.
    pub fn train_batch<'a>(&mut self, samples: impl IntoIterator<Item = &'a [u8]>) {
        for sample in samples {
            self.train(sample);
        }
    }

    /// Runs the extractor in this model's mode, invoking the visitor once
    /// per n-gram in sample order.
    pub fn for_each_ngram(&self, sample: &[u8], visit: impl FnMut(&[u8])) {
        for_each_ngram(sample, self.ngram_len, self.binary, &self.delimiters, visit);
    }

    // ========================================================================
    // Specification equivalence
    // ========================================================================

    /// Returns true iff the two models differ in n-gram length, binary flag,
    /// delimiter table, filter bitsize or hash sequence. Scoring against two
    /// filters requires this to be false.
    pub fn specs_differ(a: &Model, b: &Model) -> bool {
        a.ngram_len != b.ngram_len
            || a.binary != b.binary
            || a.delimiters.table() != b.delimiters.table()
            || a.filter.bitsize() != b.filter.bitsize()
            || a.filter.hashes() != b.filter.hashes()
    }

    /// Splits the model into its parts; the inspector builds its reference
    /// and auxiliary filters from them.
    pub(crate) fn into_parts(self) -> (usize, bool, Delimiters, BloomFilter) {
        (self.ngram_len, self.binary, self.delimiters, self.filter)
    }
}

fn validate_ngram_len(ngram_len: usize, binary: bool) -> Result<(), Error> {
    if ngram_len == 0 {
        return Err(Error::invalid_argument("n-gram length must be at least 1"));
    }
    if binary && ngram_len > MAX_BIT_NGRAM {
        return Err(Error::invalid_argument(format!(
            "bit n-grams are limited to {MAX_BIT_NGRAM} bits"
        )));
    }
    Ok(())
}
