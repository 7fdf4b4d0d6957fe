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

//! A content anomaly detector based on n-grams.
//!
//! From a corpus of known-good samples the detector builds a compact
//! probabilistic set — a Bloom filter — of every short sub-sequence
//! (n-gram) observed during training. Scoring then reports, per input
//! sample, the fraction of its n-grams never seen in training; a dual-model
//! mode discriminates two classes by differencing membership counts.
//! N-grams can be extracted over bits, bytes or delimiter-separated tokens.
//!
//! # Usage
//!
//! ```rust
//! use salad::classify::score_anomaly;
//! use salad::hash::HashSetId;
//! use salad::model::Model;
//!
//! let mut model = Model::new(1 << 20, HashSetId::Simple, 3, false, "")?;
//! model.train(b"GET /index.html HTTP/1.1");
//!
//! // Training data scores as perfectly normal.
//! assert_eq!(score_anomaly(&model, b"GET /index.html HTTP/1.1"), 0.0);
//!
//! // Unseen content scores towards 1.
//! assert!(score_anomaly(&model, b"\x90\x90\x90\x90\x90\x90") > 0.5);
//! # Ok::<(), salad::error::Error>(())
//! ```
//!
//! Trained models round-trip through a self-describing container:
//!
//! ```rust
//! use salad::container::ContainerFormat;
//! use salad::container::read_model;
//! use salad::container::write_model;
//! use salad::hash::HashSetId;
//! use salad::model::Model;
//!
//! let mut model = Model::new(1 << 16, HashSetId::Murmur, 2, false, " ")?;
//! model.train(b"the quick brown fox");
//!
//! let bytes = write_model(&model, ContainerFormat::Packaged);
//! let reloaded = read_model(&bytes)?;
//! assert!(!Model::specs_differ(&model, &reloaded));
//! # Ok::<(), salad::error::Error>(())
//! ```

pub mod bloom;
pub mod classify;
pub mod container;
pub mod error;
pub mod hash;
pub mod inspect;
pub mod input;
pub mod model;
pub mod ngram;

pub use self::bloom::BloomFilter;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::model::Model;
