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

//! Bloom filter implementation for probabilistic set membership testing.
//!
//! The filter is a fixed bit array plus an ordered sequence of hash
//! identifiers. It provides fast membership queries with no false negatives
//! (inserted items always return `true`), a tunable false positive rate, and
//! constant space usage. Binding the hash sequence is a separate step from
//! construction so that deserialization order stays explicit.
//!
//! # Usage
//!
//! ```rust
//! use salad::bloom::BloomFilter;
//! use salad::hash::HashSetId;
//!
//! let mut filter = BloomFilter::with_hash_set(1 << 16, HashSetId::Simple)?;
//! filter.insert(b"abc");
//!
//! assert!(filter.contains(b"abc"));
//! assert!(filter.popcount() >= 1);
//! # Ok::<(), salad::error::Error>(())
//! ```

mod filter;

pub use self::filter::BloomFilter;
