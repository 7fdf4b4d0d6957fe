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

//! N-gram extraction over bit, byte and token alphabets.
//!
//! The extractor is a visitor: the caller supplies a callback and the
//! extractor invokes it once per n-gram, in sample order. The callback is
//! infallible; all bookkeeping (insertion, membership counting) happens in
//! the caller's closure, which is how the trainer, both scorers and the
//! inspector share a single pipeline.
//!
//! # Usage
//!
//! ```rust
//! use salad::ngram::extract_byte_ngrams;
//!
//! let mut grams = Vec::new();
//! extract_byte_ngrams(b"abcd", 3, |gram| grams.push(gram.to_vec()));
//! assert_eq!(grams, vec![b"abc".to_vec(), b"bcd".to_vec()]);
//! ```
//!
//! Token mode splits at delimiter bytes after collapsing delimiter runs:
//!
//! ```rust
//! use salad::ngram::Delimiters;
//! use salad::ngram::extract_token_ngrams;
//!
//! let delims = Delimiters::from_spec(" ");
//! let mut grams = Vec::new();
//! extract_token_ngrams(b"the  quick brown", 2, &delims, |gram| {
//!     grams.push(String::from_utf8_lossy(gram).into_owned());
//! });
//! assert_eq!(grams, vec!["the quick", "quick brown"]);
//! ```

mod decode;
mod delimiter;
mod extract;

pub use self::decode::percent_decode_in_place;
pub use self::delimiter::Delimiters;
pub use self::extract::MAX_BIT_NGRAM;
pub use self::extract::extract_bit_ngrams;
pub use self::extract::extract_byte_ngrams;
pub use self::extract::extract_token_ngrams;
pub use self::extract::for_each_ngram;
