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

use crate::ngram::delimiter::Delimiters;

/// Widest supported bit n-gram; bit windows are packed into a `u64`.
pub const MAX_BIT_NGRAM: usize = 64;

/// Dispatches to the extractor matching the model parameters: bit mode when
/// `binary` is set, token mode when a delimiter set is present, byte mode
/// otherwise.
pub fn for_each_ngram(
    sample: &[u8],
    n: usize,
    binary: bool,
    delims: &Delimiters,
    visit: impl FnMut(&[u8]),
) {
    if binary {
        extract_bit_ngrams(sample, n, visit);
    } else if delims.is_empty() {
        extract_byte_ngrams(sample, n, visit);
    } else {
        extract_token_ngrams(sample, n, delims, visit);
    }
}

/// Emits every byte n-gram of the sample, in sample order.
///
/// The callback is invoked `max(0, len - n + 1)` times.
pub fn extract_byte_ngrams(sample: &[u8], n: usize, mut visit: impl FnMut(&[u8])) {
    if n == 0 || n > sample.len() {
        return;
    }
    for gram in sample.windows(n) {
        visit(gram);
    }
}

/// Emits every bit n-gram of the sample, in sample order.
///
/// The sample is read as a bit sequence in network order, most significant
/// bit of byte 0 first. Each window of `n` bits is packed into the low-order
/// end of a word, high-order padding bits zero, and presented as the packed
/// word's low `ceil(n / 8)` bytes. Two samples that yield the same bit
/// pattern therefore present the same byte sequence. The callback is invoked
/// `max(0, 8 * len - n + 1)` times; `n` must not exceed [`MAX_BIT_NGRAM`].
pub fn extract_bit_ngrams(sample: &[u8], n: usize, mut visit: impl FnMut(&[u8])) {
    let total = sample.len() * 8;
    if n == 0 || n > MAX_BIT_NGRAM || n > total {
        return;
    }

    let mask = if n == MAX_BIT_NGRAM {
        u64::MAX
    } else {
        (1u64 << n) - 1
    };
    let width = n.div_ceil(8);

    let mut acc: u64 = 0;
    for i in 0..total {
        let bit = (sample[i / 8] >> (7 - (i % 8))) & 1;
        acc = (acc << 1) | u64::from(bit);
        if i + 1 >= n {
            let packed = (acc & mask).to_le_bytes();
            visit(&packed[..width]);
        }
    }
}

/// Emits every token n-gram of the sample, in sample order.
///
/// The sample is first normalized: every run of one or more delimiter bytes
/// collapses to a single canonical separator (the smallest delimiter byte),
/// a leading run is dropped, and the normalized copy always ends with one
/// separator. A token is a maximal non-separator run; an n-gram is the
/// normalized substring spanning `n` consecutive tokens and their interior
/// separators. The callback is invoked `max(0, tokens - n + 1)` times.
pub fn extract_token_ngrams(
    sample: &[u8],
    n: usize,
    delims: &Delimiters,
    mut visit: impl FnMut(&[u8]),
) {
    let Some(sep) = delims.canonical_separator() else {
        return;
    };
    if n == 0 {
        return;
    }

    let mut norm = Vec::with_capacity(sample.len() + 2);
    let mut prev_sep = true;
    for &b in sample {
        if delims.contains(b) {
            if !prev_sep {
                norm.push(sep);
                prev_sep = true;
            }
        } else {
            norm.push(b);
            prev_sep = false;
        }
    }
    if !prev_sep {
        norm.push(sep);
    }

    // Token k spans starts[k]..seps[k]; normalization guarantees the two
    // run in lock step and that no token is empty.
    let mut starts = Vec::new();
    let mut seps = Vec::new();
    let mut in_token = false;
    for (i, &b) in norm.iter().enumerate() {
        if b == sep {
            seps.push(i);
            in_token = false;
        } else if !in_token {
            starts.push(i);
            in_token = true;
        }
    }

    if starts.len() < n {
        return;
    }
    for k in 0..=starts.len() - n {
        visit(&norm[starts[k]..seps[k + n - 1]]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_byte(sample: &[u8], n: usize) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        extract_byte_ngrams(sample, n, |g| out.push(g.to_vec()));
        out
    }

    fn collect_bit(sample: &[u8], n: usize) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        extract_bit_ngrams(sample, n, |g| out.push(g.to_vec()));
        out
    }

    fn collect_token(sample: &[u8], n: usize, delims: &Delimiters) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        extract_token_ngrams(sample, n, delims, |g| out.push(g.to_vec()));
        out
    }

    #[test]
    fn test_byte_ngrams_in_sample_order() {
        assert_eq!(
            collect_byte(b"abcabc", 3),
            vec![
                b"abc".to_vec(),
                b"bca".to_vec(),
                b"cab".to_vec(),
                b"abc".to_vec(),
                b"bca".to_vec(),
                b"cab".to_vec(),
            ]
        );
    }

    #[test]
    fn test_byte_ngram_counts() {
        assert_eq!(collect_byte(b"abc", 3).len(), 1);
        assert_eq!(collect_byte(b"ab", 3).len(), 0);
        assert_eq!(collect_byte(b"", 1).len(), 0);
        assert_eq!(collect_byte(b"abcd", 1).len(), 4);
    }

    #[test]
    fn test_bit_ngram_count() {
        // max(0, 8 * len - n + 1)
        assert_eq!(collect_bit(&[0xaa], 8).len(), 1);
        assert_eq!(collect_bit(&[0xaa], 3).len(), 6);
        assert_eq!(collect_bit(&[0xaa, 0x55], 8).len(), 9);
        assert_eq!(collect_bit(&[0xaa], 9).len(), 0);
        assert_eq!(collect_bit(&[], 1).len(), 0);
    }

    #[test]
    fn test_bit_ngram_packing_msb_first() {
        // 0xAA = 0b10101010; the full-byte window packs to itself.
        assert_eq!(collect_bit(&[0xaa], 8), vec![vec![0xaa]]);

        // Successive 3-bit windows of 0b10101010, packed low-order.
        let grams = collect_bit(&[0xaa], 3);
        let values: Vec<u8> = grams.iter().map(|g| g[0]).collect();
        assert_eq!(values, vec![0b101, 0b010, 0b101, 0b010, 0b101, 0b010]);
    }

    #[test]
    fn test_bit_ngram_crosses_byte_boundary() {
        // 0xF0 0x0F: windows starting at bit 4 span both bytes.
        let grams = collect_bit(&[0xf0, 0x0f], 8);
        assert_eq!(grams[0], vec![0xf0]);
        assert_eq!(grams[4], vec![0x00]);
        assert_eq!(grams[8], vec![0x0f]);
    }

    #[test]
    fn test_bit_ngram_equal_patterns_match() {
        // Different bytes, same interior bit pattern.
        let a = collect_bit(&[0b0110_0000], 4);
        let b = collect_bit(&[0b0011_0000], 4);
        assert_eq!(a[1], b[2]);
    }

    #[test]
    fn test_bit_ngram_rejects_oversized_n() {
        assert_eq!(collect_bit(&[0xff; 16], 65).len(), 0);
    }

    #[test]
    fn test_bit_ngram_word_width() {
        let grams = collect_bit(&[0xab; 8], 64);
        assert_eq!(grams.len(), 1);
        assert_eq!(grams[0], 0xabababab_abababab_u64.to_le_bytes().to_vec());
    }

    #[test]
    fn test_token_ngrams() {
        let delims = Delimiters::from_spec(" ");
        assert_eq!(
            collect_token(b"the quick brown fox", 2, &delims),
            vec![
                b"the quick".to_vec(),
                b"quick brown".to_vec(),
                b"brown fox".to_vec(),
            ]
        );
    }

    #[test]
    fn test_token_runs_collapse() {
        let delims = Delimiters::from_spec(" ,");
        // Runs of delimiters collapse to one canonical separator (the
        // smallest delimiter byte, here the space).
        assert_eq!(
            collect_token(b"a, b,,   c", 2, &delims),
            vec![b"a b".to_vec(), b"b c".to_vec()]
        );
    }

    #[test]
    fn test_token_leading_and_trailing_runs() {
        let delims = Delimiters::from_spec(" ");
        assert_eq!(
            collect_token(b"  a b  ", 2, &delims),
            vec![b"a b".to_vec()]
        );
    }

    #[test]
    fn test_token_counts() {
        let delims = Delimiters::from_spec(" ");
        assert_eq!(collect_token(b"one two three", 3, &delims).len(), 1);
        assert_eq!(collect_token(b"one two", 3, &delims).len(), 0);
        assert_eq!(collect_token(b"   ", 1, &delims).len(), 0);
        assert_eq!(collect_token(b"", 1, &delims).len(), 0);
        assert_eq!(collect_token(b"solo", 1, &delims), vec![b"solo".to_vec()]);
    }

    #[test]
    fn test_dispatch() {
        let empty = Delimiters::empty();
        let spaces = Delimiters::from_spec(" ");

        let mut count = 0;
        for_each_ngram(b"abcd", 2, false, &empty, |_| count += 1);
        assert_eq!(count, 3);

        count = 0;
        for_each_ngram(b"abcd", 2, true, &empty, |_| count += 1);
        assert_eq!(count, 31);

        count = 0;
        for_each_ngram(b"ab cd", 2, false, &spaces, |_| count += 1);
        assert_eq!(count, 1);
    }
}
