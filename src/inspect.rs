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

//! Per-sample novelty statistics against a growing or frozen reference.
//!
//! The inspector walks each sample once and counts its total, first-seen and
//! sample-distinct n-grams. Distinctness within a sample is tracked through
//! an auxiliary filter of the same geometry as the reference, cleared
//! between samples; the inspector owns it exclusively.
//!
//! # Usage
//!
//! ```rust
//! use salad::hash::HashSetId;
//! use salad::inspect::Inspector;
//! use salad::model::Model;
//!
//! let model = Model::new(1 << 20, HashSetId::Simple, 3, false, "")?;
//! let mut inspector = Inspector::updating(model);
//!
//! let first = inspector.inspect(b"abcabc");
//! assert_eq!((first.new, first.uniq, first.total), (3, 3, 6));
//!
//! let again = inspector.inspect(b"abcabc");
//! assert_eq!((again.new, again.uniq, again.total), (0, 3, 6));
//! # Ok::<(), salad::error::Error>(())
//! ```

use crate::bloom::BloomFilter;
use crate::model::Model;
use crate::ngram::Delimiters;
use crate::ngram::for_each_ngram;

/// Counters for one inspected sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleStats {
    /// Emissions first observed in this sample, relative to the reference.
    pub new: u64,
    /// Distinct emissions within this sample.
    pub uniq: u64,
    /// Total emissions.
    pub total: u64,
}

/// Streams samples and accumulates novelty statistics.
pub struct Inspector {
    ngram_len: usize,
    binary: bool,
    delimiters: Delimiters,
    reference: BloomFilter,
    aux: BloomFilter,
    update_reference: bool,
}

impl Inspector {
    /// An inspector whose reference starts empty and grows over the stream:
    /// `new` counts first occurrences within the stream itself. The model
    /// supplies geometry and extraction parameters; its filter content is
    /// discarded.
    pub fn updating(model: Model) -> Inspector {
        let mut inspector = Self::frozen(model);
        inspector.reference.clear();
        inspector.update_reference = true;
        inspector
    }

    /// An inspector with an immutable pre-trained reference: `new` counts
    /// n-grams absent from that model.
    pub fn frozen(model: Model) -> Inspector {
        let (ngram_len, binary, delimiters, reference) = model.into_parts();
        let mut aux = reference.clone();
        aux.clear();
        Inspector {
            ngram_len,
            binary,
            delimiters,
            reference,
            aux,
            update_reference: false,
        }
    }

    /// Walks one sample and returns its counters.
    pub fn inspect(&mut self, sample: &[u8]) -> SampleStats {
        self.aux.clear();

        let mut stats = SampleStats::default();
        let reference = &mut self.reference;
        let aux = &mut self.aux;
        let update_reference = self.update_reference;

        for_each_ngram(
            sample,
            self.ngram_len,
            self.binary,
            &self.delimiters,
            |gram| {
                if update_reference {
                    if !reference.contains_and_insert(gram) {
                        stats.new += 1;
                    }
                } else if !reference.contains(gram) {
                    stats.new += 1;
                }
                if !aux.contains_and_insert(gram) {
                    stats.uniq += 1;
                }
                stats.total += 1;
            },
        );

        stats
    }

    /// The reference filter in its current state.
    pub fn reference(&self) -> &BloomFilter {
        &self.reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashSetId;

    fn model(n: usize, delim: &str) -> Model {
        Model::new(1 << 20, HashSetId::Simple, n, false, delim).unwrap()
    }

    #[test]
    fn test_updating_counts_stream_firsts() {
        let mut inspector = Inspector::updating(model(3, ""));

        let first = inspector.inspect(b"abcabc");
        assert_eq!(first, SampleStats { new: 3, uniq: 3, total: 6 });

        // Everything was seen in the first sample.
        let second = inspector.inspect(b"abc");
        assert_eq!(second, SampleStats { new: 0, uniq: 1, total: 1 });

        let third = inspector.inspect(b"abxy");
        assert_eq!(third.total, 2);
        assert_eq!(third.uniq, 2);
        assert_eq!(third.new, 2);
    }

    #[test]
    fn test_frozen_reference_does_not_grow() {
        let mut trained = model(3, "");
        trained.train(b"abc");
        let mut inspector = Inspector::frozen(trained);

        // "abc" is known; repeating the sample must keep reporting the
        // unknown grams as new because the reference never grows.
        let first = inspector.inspect(b"abcxyz");
        let second = inspector.inspect(b"abcxyz");
        assert_eq!(first, second);
        assert_eq!(first.total, 4);
        assert_eq!(first.new, 3);
        assert_eq!(first.uniq, 4);
    }

    #[test]
    fn test_frozen_counts_duplicate_unknowns_per_emission() {
        let mut trained = model(3, "");
        trained.train(b"zzz");
        let mut inspector = Inspector::frozen(trained);

        // "abcabc" emits the unknown grams abc, bca, cab twice each.
        let stats = inspector.inspect(b"abcabc");
        assert_eq!(stats.new, 6);
        assert_eq!(stats.uniq, 3);
        assert_eq!(stats.total, 6);
    }

    #[test]
    fn test_aux_filter_cleared_between_samples() {
        let mut inspector = Inspector::updating(model(2, " "));

        let a = inspector.inspect(b"one two three");
        assert_eq!(a.uniq, 2);

        // Same tokens again: uniq is per-sample, so it resets.
        let b = inspector.inspect(b"one two three");
        assert_eq!(b.uniq, 2);
        assert_eq!(b.new, 0);
    }

    #[test]
    fn test_empty_sample() {
        let mut inspector = Inspector::updating(model(3, ""));
        assert_eq!(inspector.inspect(b""), SampleStats::default());
    }
}
